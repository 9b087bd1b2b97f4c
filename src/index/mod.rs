//! Read-only similarity search over embedded document chunks.
//!
//! The expansion pipeline only ever talks to a [`CorpusIndex`]; how chunks got
//! there (loading, splitting, embedding) is the caller's business.
//! [`InMemoryIndex`] is a small reference implementation backed by a
//! [`TextEmbedder`](crate::llm::embeddings::TextEmbedder).

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::llm::embeddings::EmbeddingError;

pub use memory::InMemoryIndex;


#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Relevance score {0} outside [0, 1]")]
    InvalidScore(f64),

    #[error("Index backend error: {0}")]
    Backend(String),
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Chunk {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}


/// A retrieved chunk with its relevance to the query, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f64,
}


/// How raw vector similarity becomes a relevance score in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum RelevanceMetric {
    /// Cosine similarity, negative values floored at zero.
    Cosine,
    /// `1 - d / sqrt(2)` where `d` is the L2 distance between unit vectors.
    #[default]
    Euclidean,
}

impl TryFrom<String> for RelevanceMetric {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl RelevanceMetric {
    pub fn relevance(&self, cosine: f64) -> f64 {
        let score = match self {
            Self::Cosine => cosine,
            Self::Euclidean => {
                let distance = (2.0 - 2.0 * cosine).max(0.0).sqrt();
                1.0 - distance / std::f64::consts::SQRT_2
            }
        };
        score.clamp(0.0, 1.0)
    }
}


#[async_trait]
pub trait CorpusIndex: Send + Sync {
    /// Up to `k` chunks most similar to `query`, best first.
    ///
    /// An empty corpus or a blank query yields an empty list, not an error.
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, IndexError>;


    fn name(&self) -> &str {
        "corpus"
    }
}
