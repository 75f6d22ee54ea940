use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredQuestion {
    pub seq: u64,
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    /// Name of the embedder that produced `embedding`.
    pub embedder: String,
    pub created_at: DateTime<Utc>,
}

fn decode_seq(raw: &[u8]) -> Option<u64> {
    <[u8; 8]>::try_from(raw).ok().map(u64::from_be_bytes)
}

impl Store {
    /// Appends a question under the next sequence number.
    pub fn insert_question(
        &self,
        text: &str,
        embedding: Vec<f32>,
        embedder: &str,
    ) -> Result<StoredQuestion, StoreError> {
        let seq = self.next_question_seq()?;
        let key = keys::question_key(seq);
        let question = StoredQuestion {
            seq,
            id: keys::question_id(seq),
            text: text.to_string(),
            embedding,
            embedder: embedder.to_string(),
            created_at: Utc::now(),
        };

        let swapped = self.questions.compare_and_swap(
            key.as_bytes(),
            None as Option<&[u8]>,
            Some(Self::serialize(&question)?),
        )?;
        if swapped.is_err() {
            return Err(StoreError::Conflict {
                entity: "question".to_string(),
                key: question.id,
            });
        }
        Ok(question)
    }

    /// Swaps in a vector produced by another embedder, keeping the text,
    /// id and timestamp.
    pub fn replace_embedding(
        &self,
        seq: u64,
        embedding: Vec<f32>,
        embedder: &str,
    ) -> Result<StoredQuestion, StoreError> {
        let key = keys::question_key(seq);
        let raw = self
            .questions
            .get(key.as_bytes())?
            .ok_or_else(|| StoreError::NotFound {
                entity: "question".to_string(),
                key: keys::question_id(seq),
            })?;
        let mut question: StoredQuestion = Self::deserialize(&raw)?;
        question.embedding = embedding;
        question.embedder = embedder.to_string();
        self.questions
            .insert(key.as_bytes(), Self::serialize(&question)?)?;
        Ok(question)
    }

    pub fn count_questions(&self) -> usize {
        self.questions.len()
    }

    /// All stored questions in insertion order.
    pub fn list_questions(&self) -> Result<Vec<StoredQuestion>, StoreError> {
        let mut out = Vec::with_capacity(self.questions.len());
        for item in self.questions.iter() {
            let (_, raw) = item?;
            out.push(Self::deserialize(&raw)?);
        }
        Ok(out)
    }

    /// Bumps the counter in `meta`. It never falls below the number of
    /// stored questions, so a missing or damaged counter cannot reuse a key.
    fn next_question_seq(&self) -> Result<u64, StoreError> {
        let floor = self.questions.len() as u64;
        let next = self.meta.update_and_fetch(keys::QUESTION_SEQ, |old| {
            let last = old.and_then(decode_seq).unwrap_or(0).max(floor);
            Some((last + 1).to_be_bytes().to_vec())
        })?;
        next.as_deref()
            .and_then(decode_seq)
            .ok_or_else(|| StoreError::Corrupt {
                key: keys::QUESTION_SEQ.to_string(),
            })
    }
}
