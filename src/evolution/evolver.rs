use crate::evolution::config::PromptSet;
use crate::evolution::prompt;
use crate::services::llm_provider::{ChatMessage, CompletionProvider, LlmError};

/// Smoothed score above which questions are made harder.
pub const HARDER_ABOVE: f64 = 0.75;
/// Smoothed score below which questions are made simpler.
pub const SIMPLER_BELOW: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evolution {
    Harder,
    Simpler,
    Keep,
}

impl Evolution {
    pub fn for_score(smoothed: f64) -> Self {
        if smoothed > HARDER_ABOVE {
            Self::Harder
        } else if smoothed < SIMPLER_BELOW {
            Self::Simpler
        } else {
            Self::Keep
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Harder => "harder",
            Self::Simpler => "simpler",
            Self::Keep => "keep",
        }
    }

    fn template(self, prompts: &PromptSet) -> Option<&str> {
        match self {
            Self::Harder => Some(prompts.harder.as_str()),
            Self::Simpler => Some(prompts.simpler.as_str()),
            Self::Keep => None,
        }
    }
}

/// Rewrites `question` according to `smoothed`. In the neutral band the
/// question comes back unchanged and the provider is not called.
pub async fn evolve(
    provider: &dyn CompletionProvider,
    prompts: &PromptSet,
    question: String,
    smoothed: f64,
) -> Result<String, LlmError> {
    let direction = Evolution::for_score(smoothed);
    let Some(template) = direction.template(prompts) else {
        return Ok(question);
    };

    let query = prompt::render_lenient(template, &[("question", question.as_str())]);
    let rewritten = provider.complete(&[ChatMessage::user(query)]).await?;
    tracing::debug!(direction = direction.as_str(), smoothed, "Question evolved");
    Ok(rewritten)
}
