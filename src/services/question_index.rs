use std::sync::Arc;

use async_trait::async_trait;

use crate::services::embedding::{cosine_distance, Embedder, EmbeddingError};
use crate::store::operations::questions::StoredQuestion;
use crate::store::{Store, StoreError};

/// Distance reported when there is nothing to compare against.
pub const EMPTY_STORE_DISTANCE: f64 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum NoveltyError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error("embedder {embedder} returned {found} dimensions, expected {expected}")]
    DimensionMismatch {
        embedder: String,
        expected: usize,
        found: usize,
    },
}

/// Nearest-neighbor lookup over previously accepted questions.
#[async_trait]
pub trait NoveltyStore: Send + Sync {
    async fn index(&self, text: &str) -> Result<(), NoveltyError>;

    /// Cosine distance from `text` to the closest stored question, or
    /// [`EMPTY_STORE_DISTANCE`] when nothing is stored.
    async fn nearest_distance(&self, text: &str) -> Result<f64, NoveltyError>;

    fn count(&self) -> Result<usize, NoveltyError>;

    fn list_all(&self) -> Result<Vec<String>, NoveltyError>;
}

pub struct QuestionIndex {
    store: Arc<Store>,
    embedder: Arc<dyn Embedder>,
}

impl QuestionIndex {
    pub fn new(store: Arc<Store>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    fn is_current(&self, question: &StoredQuestion, dimension: usize) -> bool {
        question.embedder == self.embedder.name() && question.embedding.len() == dimension
    }

    /// Moves a question embedded by another model (or at another
    /// dimension) into the current embedder's space and persists it.
    async fn reembed(
        &self,
        question: StoredQuestion,
        dimension: usize,
    ) -> Result<StoredQuestion, NoveltyError> {
        let embedding = self.embedder.embed(&question.text).await?;
        if embedding.len() != dimension {
            return Err(NoveltyError::DimensionMismatch {
                embedder: self.embedder.name().to_string(),
                expected: dimension,
                found: embedding.len(),
            });
        }
        Ok(self
            .store
            .replace_embedding(question.seq, embedding, self.embedder.name())?)
    }
}

#[async_trait]
impl NoveltyStore for QuestionIndex {
    async fn index(&self, text: &str) -> Result<(), NoveltyError> {
        let embedding = self.embedder.embed(text).await?;
        let stored = self
            .store
            .insert_question(text, embedding, self.embedder.name())?;
        tracing::debug!(id = %stored.id, embedder = self.embedder.name(), "Question indexed");
        Ok(())
    }

    async fn nearest_distance(&self, text: &str) -> Result<f64, NoveltyError> {
        let stored = self.store.list_questions()?;
        if stored.is_empty() {
            return Ok(EMPTY_STORE_DISTANCE);
        }
        if stored.iter().any(|q| q.text == text) {
            return Ok(0.0);
        }

        let query = self.embedder.embed(text).await?;
        let mut nearest = f64::INFINITY;
        let mut refreshed = 0_usize;
        for mut question in stored {
            if !self.is_current(&question, query.len()) {
                question = self.reembed(question, query.len()).await?;
                refreshed += 1;
            }
            nearest = nearest.min(cosine_distance(&query, &question.embedding));
        }
        if refreshed > 0 {
            tracing::warn!(
                refreshed,
                embedder = self.embedder.name(),
                "Re-embedded stored questions from a different embedder"
            );
        }

        Ok(if nearest.is_finite() {
            nearest
        } else {
            EMPTY_STORE_DISTANCE
        })
    }

    fn count(&self) -> Result<usize, NoveltyError> {
        Ok(self.store.count_questions())
    }

    fn list_all(&self) -> Result<Vec<String>, NoveltyError> {
        Ok(self
            .store
            .list_questions()?
            .into_iter()
            .map(|q| q.text)
            .collect())
    }
}
