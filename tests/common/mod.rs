#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;

use evogen::evolution::config::{EvogenConfig, EvolutionSettings, PromptSet};
use evogen::services::llm_provider::{ChatMessage, CompletionProvider, LlmError};
use evogen::services::question_index::{NoveltyError, NoveltyStore, EMPTY_STORE_DISTANCE};

pub const GENERATE: &str = "GENERATE a question.";
pub const HARDER_PREFIX: &str = "HARDER:";
pub const SIMPLER_PREFIX: &str = "SIMPLER:";
pub const JUDGE_PREFIX: &str = "JUDGE";

/// Questions from unrelated domains so hashed embeddings stay far apart.
pub const QUESTION_POOL: &[&str] = &[
    "What is the boiling point of water at sea level in Celsius?",
    "Which planet in our solar system has the most moons?",
    "Explain why binary search requires a sorted array.",
    "Who painted the ceiling of the Sistine Chapel?",
    "How many chromosomes do human somatic cells contain?",
    "What does the TCP three-way handshake accomplish?",
    "Name the longest river that flows through Egypt.",
    "Why does ice float on liquid water?",
    "In chess, how does a knight move across the board?",
    "What causes the seasons on Earth?",
];

pub fn prompts() -> PromptSet {
    PromptSet {
        generator: GENERATE.to_string(),
        scorer: format!("{JUDGE_PREFIX} question={{question}} answer={{answer}}"),
        harder: format!("{HARDER_PREFIX} {{question}}"),
        simpler: format!("{SIMPLER_PREFIX} {{question}}"),
    }
}

pub fn evogen_config(novelty_threshold: f64, retry: u32, span: u32) -> EvogenConfig {
    EvogenConfig {
        settings: EvolutionSettings {
            novelty_threshold,
            retry,
            span,
        },
        prompts: prompts(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Generate,
    Answer,
    Judge,
    Harder,
    Simpler,
}

fn classify(content: &str) -> CallKind {
    if content == GENERATE {
        CallKind::Generate
    } else if content.starts_with(JUDGE_PREFIX) {
        CallKind::Judge
    } else if content.starts_with(HARDER_PREFIX) {
        CallKind::Harder
    } else if content.starts_with(SIMPLER_PREFIX) {
        CallKind::Simpler
    } else {
        CallKind::Answer
    }
}

/// Completion provider double that answers by prompt kind and records
/// every request it receives.
#[derive(Default)]
pub struct ScriptedProvider {
    questions: Mutex<VecDeque<String>>,
    judge_replies: Mutex<VecDeque<String>>,
    default_judge_reply: Mutex<String>,
    calls: Mutex<Vec<(CallKind, String)>>,
    shutdown_after_judge: Mutex<Option<(usize, broadcast::Sender<()>)>>,
    fail_answers: Mutex<bool>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        let provider = Self::default();
        *provider.default_judge_reply.lock().unwrap() = "0.5".to_string();
        Arc::new(provider)
    }

    pub fn with_questions(self: Arc<Self>, questions: &[&str]) -> Arc<Self> {
        self.questions
            .lock()
            .unwrap()
            .extend(questions.iter().map(|q| q.to_string()));
        self
    }

    pub fn with_judge_replies(self: Arc<Self>, replies: &[&str]) -> Arc<Self> {
        self.judge_replies
            .lock()
            .unwrap()
            .extend(replies.iter().map(|r| r.to_string()));
        self
    }

    pub fn with_default_judge_reply(self: Arc<Self>, reply: &str) -> Arc<Self> {
        *self.default_judge_reply.lock().unwrap() = reply.to_string();
        self
    }

    /// Fires `tx` while serving the `n`-th judge request, i.e. mid-cycle.
    pub fn shutdown_on_judge_call(self: Arc<Self>, n: usize, tx: broadcast::Sender<()>) -> Arc<Self> {
        *self.shutdown_after_judge.lock().unwrap() = Some((n, tx));
        self
    }

    pub fn failing_answers(self: Arc<Self>) -> Arc<Self> {
        *self.fail_answers.lock().unwrap() = true;
        self
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    pub fn prompts_of(&self, kind: CallKind) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        assert_eq!(messages.len(), 1, "every request is a single user message");
        assert_eq!(messages[0].role, "user");
        let content = messages[0].content.clone();
        let kind = classify(&content);
        self.calls.lock().unwrap().push((kind, content.clone()));

        match kind {
            CallKind::Generate => {
                let generated = self.count(CallKind::Generate);
                Ok(self.questions.lock().unwrap().pop_front().unwrap_or_else(|| {
                    QUESTION_POOL[(generated - 1) % QUESTION_POOL.len()].to_string()
                }))
            }
            CallKind::Answer => {
                if *self.fail_answers.lock().unwrap() {
                    return Err(LlmError::Network("connection refused".to_string()));
                }
                Ok(format!("An answer to: {content}"))
            }
            CallKind::Judge => {
                let judged = self.count(CallKind::Judge);
                if let Some((n, tx)) = self.shutdown_after_judge.lock().unwrap().as_ref() {
                    if judged == *n {
                        let _ = tx.send(());
                    }
                }
                let reply = self.judge_replies.lock().unwrap().pop_front();
                Ok(reply.unwrap_or_else(|| self.default_judge_reply.lock().unwrap().clone()))
            }
            CallKind::Harder => Ok(format!(
                "Harder version: {}",
                content.trim_start_matches(HARDER_PREFIX).trim()
            )),
            CallKind::Simpler => Ok(format!(
                "Simpler version: {}",
                content.trim_start_matches(SIMPLER_PREFIX).trim()
            )),
        }
    }
}

/// In-memory novelty store with scripted distances; unscripted queries
/// report the empty-store sentinel.
#[derive(Default)]
pub struct MemoryNovelty {
    distances: Mutex<VecDeque<f64>>,
    stored: Mutex<Vec<String>>,
    queries: Mutex<usize>,
}

impl MemoryNovelty {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_distances(self: Arc<Self>, distances: &[f64]) -> Arc<Self> {
        self.distances.lock().unwrap().extend(distances.iter().copied());
        self
    }

    pub fn stored(&self) -> Vec<String> {
        self.stored.lock().unwrap().clone()
    }

    pub fn queries(&self) -> usize {
        *self.queries.lock().unwrap()
    }
}

#[async_trait]
impl NoveltyStore for MemoryNovelty {
    async fn index(&self, text: &str) -> Result<(), NoveltyError> {
        self.stored.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn nearest_distance(&self, _text: &str) -> Result<f64, NoveltyError> {
        *self.queries.lock().unwrap() += 1;
        Ok(self
            .distances
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(EMPTY_STORE_DISTANCE))
    }

    fn count(&self) -> Result<usize, NoveltyError> {
        Ok(self.stored.lock().unwrap().len())
    }

    fn list_all(&self) -> Result<Vec<String>, NoveltyError> {
        Ok(self.stored())
    }
}
