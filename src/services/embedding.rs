//! Text embedding backends used by the question index.
//!
//! The default [`HashingEmbedder`] needs no network access: it hashes
//! character n-grams into a fixed-size vector, which is enough to catch
//! near-duplicate questions. [`RemoteEmbedder`] calls an OpenAI-compatible
//! `/embeddings` endpoint when a real embedding model is configured.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::LLMConfig;
use crate::services::llm_provider::{map_transport_error, LlmError};

/// Dimension of hashed embeddings.
pub const HASHED_EMBEDDING_DIM: usize = 384;

const NGRAM_SIZES: std::ops::RangeInclusive<usize> = 2..=4;

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Provider(#[from] LlmError),
    #[error("embedding response contained no vectors")]
    Empty,
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn name(&self) -> &str;
}

/// Cosine similarity of two vectors. Mismatched lengths are orthogonal.
/// Two zero vectors are identical; a zero vector against anything else is
/// orthogonal.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    match (norm_a == 0.0, norm_b == 0.0) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        (false, false) => {}
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Cosine distance in `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    1.0 - f64::from(cosine_similarity(a, b))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HashingEmbedder;

impl HashingEmbedder {
    pub fn embed_sync(text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; HASHED_EMBEDDING_DIM];
        let normalized: String = text
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let chars: Vec<char> = normalized.chars().collect();

        if chars.len() < *NGRAM_SIZES.start() {
            // Too short for any n-gram: the whole text is the only feature.
            add_feature(&mut embedding, &normalized);
        }
        for size in NGRAM_SIZES {
            for window in chars.windows(size) {
                let gram: String = window.iter().collect();
                add_feature(&mut embedding, &gram);
            }
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for v in &mut embedding {
                *v /= magnitude;
            }
        }
        embedding
    }
}

fn add_feature(embedding: &mut [f32], feature: &str) {
    let digest = Sha256::digest(feature.as_bytes());
    let bucket =
        u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize % embedding.len();
    // One digest bit picks the sign so unrelated grams cancel out instead of piling up.
    let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
    embedding[bucket] += sign;
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(Self::embed_sync(text))
    }

    fn name(&self) -> &str {
        "sha256-ngram"
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct RemoteEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl RemoteEmbedder {
    pub fn new(config: &LLMConfig, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };
        let mut builder = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let body: EmbeddingResponse = response.json().await.map_err(map_transport_error)?;
        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(EmbeddingError::Empty)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
