use crate::evolution::config::PromptSet;
use crate::evolution::prompt;
use crate::services::llm_provider::{ChatMessage, CompletionProvider, LlmError};

/// Asks the model under evaluation to answer `question`.
pub async fn generate_response(
    provider: &dyn CompletionProvider,
    question: &str,
) -> Result<String, LlmError> {
    provider.complete(&[ChatMessage::user(question)]).await
}

/// LLM-as-a-judge score for a question/response pair.
///
/// A reply that is not a finite number scores `0.0`; the judge never fails
/// the cycle for formatting reasons. Transport errors still propagate.
pub async fn score(
    provider: &dyn CompletionProvider,
    prompts: &PromptSet,
    question: &str,
    response: &str,
) -> Result<f64, LlmError> {
    let query = prompt::render_lenient(
        &prompts.scorer,
        &[("question", question), ("answer", response)],
    );
    let reply = provider.complete(&[ChatMessage::user(query)]).await?;
    Ok(parse_score(&reply))
}

pub fn parse_score(reply: &str) -> f64 {
    let compact: String = reply.chars().filter(|c| !c.is_whitespace()).collect();
    match compact.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            tracing::debug!(reply = %reply, "Judge reply is not a number, scoring 0");
            0.0
        }
    }
}
