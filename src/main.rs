use std::process::ExitCode;
use std::sync::Arc;

use evogen::config::{Config, LLMConfig};
use evogen::evolution::config::EvogenConfig;
use evogen::evolution::engine::BenchmarkLoop;
use evogen::evolution::journal::ScoreJournal;
use evogen::logging::{init_tracing, LogConfig};
use evogen::services::embedding::{Embedder, HashingEmbedder, RemoteEmbedder};
use evogen::services::llm_provider::LlmProvider;
use evogen::services::question_index::QuestionIndex;
use evogen::store::Store;
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    init_tracing(&LogConfig {
        log_level: config.log_level.clone(),
        enable_file_logs: config.enable_file_logs,
        log_dir: config.log_dir.clone(),
    });
    tracing::info!("Starting evogen");
    config.warn_invalid_env();

    let evogen_config = match EvogenConfig::load(&config) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load evogen config");
            return ExitCode::FAILURE;
        }
    };
    let llm_config = match LLMConfig::load(&config) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load model config");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        provider = llm_config.provider.as_str(),
        model = %llm_config.model,
        "Loaded model config"
    );

    let sled_path = config.sled_path();
    let store = match Store::open(&sled_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, path = %sled_path.display(), "Failed to open question store");
            return ExitCode::FAILURE;
        }
    };

    let embedder: Arc<dyn Embedder> = match &llm_config.embedding_model {
        Some(model) => Arc::new(RemoteEmbedder::new(&llm_config, model)),
        None => Arc::new(HashingEmbedder),
    };
    tracing::info!(embedder = embedder.name(), "Question index ready");

    let provider = Arc::new(LlmProvider::new(&llm_config));
    let novelty = Arc::new(QuestionIndex::new(store.clone(), embedder));
    let journal = ScoreJournal::new(config.scores_path());

    let mut benchmark = match BenchmarkLoop::new(provider, novelty, evogen_config, journal) {
        Ok(benchmark) => benchmark,
        Err(e) => {
            tracing::error!(error = %e, "Failed to restore score history");
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    tokio::spawn(shutdown_signal(shutdown_tx));

    let outcome = benchmark.run(shutdown_rx).await;

    if let Err(e) = store.flush() {
        tracing::error!(error = %e, "Failed to flush store before exit");
    }

    match outcome {
        Ok(summary) => {
            tracing::info!(
                cycles = summary.cycles,
                questions = summary.stored_questions,
                "Shutdown complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Benchmark loop aborted");
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                    tracing::info!("Shutdown signal received, finishing current cycle");
                    let _ = shutdown_tx.send(());
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received, finishing current cycle");
    let _ = shutdown_tx.send(());
}
