use std::sync::Arc;

use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::evolution::config::EvogenConfig;
use crate::evolution::evolver::{self, Evolution};
use crate::evolution::gate::{self, GateError};
use crate::evolution::journal::{JournalError, ScoreJournal};
use crate::evolution::judge;
use crate::evolution::report;
use crate::evolution::smoother::ScoreSmoother;
use crate::services::llm_provider::{CompletionProvider, LlmError};
use crate::services::question_index::{NoveltyError, NoveltyStore};

#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("completion provider unavailable: {0}")]
    ProviderUnavailable(#[from] LlmError),
    #[error(
        "novelty exhausted after {attempts} attempts \
         (threshold {threshold}, last distance {last_distance:.4})"
    )]
    NoveltyExhausted {
        attempts: u32,
        threshold: f64,
        last_distance: f64,
    },
    #[error("novelty store failure: {0}")]
    Novelty(#[from] NoveltyError),
    #[error(transparent)]
    Journal(#[from] JournalError),
}

impl From<GateError> for LoopError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Exhausted {
                attempts,
                threshold,
                last_distance,
            } => Self::NoveltyExhausted {
                attempts,
                threshold,
                last_distance,
            },
            GateError::Provider(e) => Self::ProviderUnavailable(e),
            GateError::Novelty(e) => Self::Novelty(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub question: String,
    pub raw_score: f64,
    pub smoothed: f64,
    pub evolution: Evolution,
    pub stored_question: String,
    pub stored_questions: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub cycles: u64,
    pub stored_questions: usize,
    pub scores: usize,
}

/// The adaptive benchmark loop: novelty-gated generation, answering,
/// judging, smoothing and difficulty evolution, one cycle at a time.
pub struct BenchmarkLoop {
    provider: Arc<dyn CompletionProvider>,
    novelty: Arc<dyn NoveltyStore>,
    config: EvogenConfig,
    smoother: ScoreSmoother,
    journal: ScoreJournal,
    history: Vec<f64>,
}

impl BenchmarkLoop {
    /// Builds the loop and restores the score history from `journal`.
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        novelty: Arc<dyn NoveltyStore>,
        config: EvogenConfig,
        journal: ScoreJournal,
    ) -> Result<Self, JournalError> {
        let history = journal.load()?;
        if !history.is_empty() {
            tracing::info!(scores = history.len(), "Restored score history");
        }
        Ok(Self {
            provider,
            novelty,
            smoother: ScoreSmoother::new(config.settings.span),
            config,
            journal,
            history,
        })
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Runs cycles until `shutdown` fires, then prints the corpus and saves
    /// the score history. The signal is only observed between cycles.
    ///
    /// Errors end the run immediately and leave the journal untouched.
    pub async fn run(
        &mut self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<RunSummary, LoopError> {
        tracing::info!("Press Ctrl+C to stop...");
        let mut cycles = 0_u64;
        while !stop_requested(&mut shutdown) {
            self.run_cycle().await?;
            cycles += 1;
        }
        self.stop(cycles)
    }

    pub async fn run_cycle(&mut self) -> Result<CycleReport, LoopError> {
        let provider = self.provider.as_ref();
        let prompts = &self.config.prompts;

        let question = gate::generate_novel_question(
            provider,
            self.novelty.as_ref(),
            &self.config.settings,
            prompts,
        )
        .await?;
        let response = judge::generate_response(provider, &question).await?;
        let raw_score = judge::score(provider, prompts, &question, &response).await?;

        self.history.push(raw_score);
        let smoothed = self.smoother.smooth(&self.history).unwrap_or(raw_score);

        let evolution = Evolution::for_score(smoothed);
        let stored_question = evolver::evolve(provider, prompts, question.clone(), smoothed).await?;
        self.novelty.index(&stored_question).await?;

        let stored_questions = self.novelty.count()?;
        tracing::info!(
            questions = stored_questions,
            score = smoothed,
            raw_score,
            direction = evolution.as_str(),
            "#Questions: {stored_questions}, Score: {smoothed:.4}"
        );

        Ok(CycleReport {
            question,
            raw_score,
            smoothed,
            evolution,
            stored_question,
            stored_questions,
        })
    }

    /// The clean shutdown path: print what was collected and checkpoint
    /// the raw scores.
    pub fn stop(&self, cycles: u64) -> Result<RunSummary, LoopError> {
        let corpus = self.novelty.list_all()?;
        println!("{}", report::corpus_table(&corpus));

        self.journal.save(&self.history)?;
        tracing::info!(
            cycles,
            questions = corpus.len(),
            scores = self.history.len(),
            path = %self.journal.path().display(),
            "Benchmark loop stopped"
        );

        Ok(RunSummary {
            cycles,
            stored_questions: corpus.len(),
            scores: self.history.len(),
        })
    }
}

fn stop_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
    !matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
}
