use crate::evolution::config::{EvolutionSettings, PromptSet};
use crate::services::llm_provider::{ChatMessage, CompletionProvider, LlmError};
use crate::services::question_index::{NoveltyError, NoveltyStore};

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error(
        "no novel question after {attempts} attempts \
         (threshold {threshold}, last distance {last_distance:.4})"
    )]
    Exhausted {
        attempts: u32,
        threshold: f64,
        last_distance: f64,
    },
    #[error(transparent)]
    Provider(#[from] LlmError),
    #[error(transparent)]
    Novelty(#[from] NoveltyError),
}

/// Generates candidates until one is far enough from everything already
/// stored, consuming at most `settings.retry` attempts.
pub async fn generate_novel_question(
    provider: &dyn CompletionProvider,
    novelty: &dyn NoveltyStore,
    settings: &EvolutionSettings,
    prompts: &PromptSet,
) -> Result<String, GateError> {
    let messages = [ChatMessage::user(prompts.generator.as_str())];
    let mut last_distance = f64::NAN;

    for attempt in 1..=settings.retry {
        let candidate = provider.complete(&messages).await?;
        let distance = novelty.nearest_distance(&candidate).await?;
        if distance > settings.novelty_threshold {
            tracing::debug!(attempt, distance, "Novel question accepted");
            return Ok(candidate);
        }
        tracing::warn!(
            attempt,
            retry = settings.retry,
            distance,
            threshold = settings.novelty_threshold,
            "Candidate too similar to stored questions"
        );
        last_distance = distance;
    }

    Err(GateError::Exhausted {
        attempts: settings.retry,
        threshold: settings.novelty_threshold,
        last_distance,
    })
}
