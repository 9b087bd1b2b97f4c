

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Chunk, CorpusIndex, IndexError, RelevanceMetric, ScoredChunk};
use crate::llm::embeddings::TextEmbedder;


struct IndexedChunk {
    chunk: Chunk,
    unit: Vec<f32>,
}


/// Brute-force vector index held in memory.
pub struct InMemoryIndex {
    embedder: Arc<dyn TextEmbedder>,
    metric: RelevanceMetric,
    entries: RwLock<Vec<IndexedChunk>>,
}

impl InMemoryIndex {
    pub fn new(embedder: Arc<dyn TextEmbedder>, metric: RelevanceMetric) -> Self {
        info!(
            "InMemoryIndex initialized: embedder={}, metric={}",
            embedder.model_name(),
            metric
        );
        Self {
            embedder,
            metric,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Embed and store chunks. Blank chunks are skipped.
    ///
    /// Returns how many chunks were added. On error nothing from this batch
    /// is stored.
    pub async fn insert(&self, chunks: impl IntoIterator<Item = Chunk>) -> Result<usize, IndexError> {
        let mut batch = Vec::new();
        for chunk in chunks {
            if chunk.content.trim().is_empty() {
                warn!("Skipping blank chunk (source={:?})", chunk.source);
                continue;
            }
            let embedding = self.embedder.embed(&chunk.content).await?;
            batch.push(IndexedChunk {
                chunk,
                unit: normalize(embedding),
            });
        }

        let mut entries = self.entries.write();
        let expected = entries.first().or(batch.first()).map(|e| e.unit.len());
        if let Some(expected) = expected {
            if let Some(bad) = batch.iter().find(|e| e.unit.len() != expected) {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    found: bad.unit.len(),
                });
            }
        }

        let added = batch.len();
        entries.extend(batch);
        debug!("Indexed {} chunks ({} total)", added, entries.len());
        Ok(added)
    }


    pub fn len(&self) -> usize {
        self.entries.read().len()
    }


    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }


    pub fn metric(&self) -> RelevanceMetric {
        self.metric
    }
}

#[async_trait]
impl CorpusIndex for InMemoryIndex {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        if k == 0 || query.trim().is_empty() || self.is_empty() {
            return Ok(Vec::new());
        }

        let query_unit = normalize(self.embedder.embed(query).await?);

        let entries = self.entries.read();
        let mut scored = Vec::with_capacity(entries.len());
        for entry in entries.iter() {
            if entry.unit.len() != query_unit.len() {
                return Err(IndexError::DimensionMismatch {
                    expected: entry.unit.len(),
                    found: query_unit.len(),
                });
            }
            let cosine = dot(&query_unit, &entry.unit);
            scored.push(ScoredChunk {
                chunk: entry.chunk.clone(),
                score: self.metric.relevance(cosine),
            });
        }
        drop(entries);

        // Stable: equal scores keep insertion order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}


fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}


fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum()
}
