

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;

use crate::core::error::{ExpansionError, Result, Stage};
use crate::index::{CorpusIndex, IndexError, ScoredChunk};
use crate::utils::round_score;


/// Mean relevance of `results`, rounded to five decimals; `0.0` when empty.
pub fn mean_relevance(results: &[ScoredChunk]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let total: f64 = results.iter().map(|r| r.score).sum();
    round_score(total / results.len() as f64)
}


/// Scores one query by the average relevance of its top `k` index results.
pub struct RelevanceScorer {
    index: Arc<dyn CorpusIndex>,
    timeout: Duration,
}

impl RelevanceScorer {
    pub fn new(index: Arc<dyn CorpusIndex>, timeout: Duration) -> Self {
        Self { index, timeout }
    }

    /// Average relevance of the `k` best results for `query`.
    ///
    /// `k` is the number of results requested from the index; fewer may come
    /// back. A query with no results scores `0.0`. Index failures are errors,
    /// never a default score.
    pub async fn score(&self, query: &str, k: usize) -> Result<f64> {
        let results = self.search(query, k, Stage::Scoring).await?;
        let score = mean_relevance(&results);
        debug!(
            "Scored '{}': {:.5} over {} results",
            crate::safe_truncate(query, 50),
            score,
            results.len()
        );
        Ok(score)
    }

    /// Bounded similarity search with the index contract checked.
    ///
    /// At most `k` results are returned even if the index sends more.
    pub async fn search(&self, query: &str, k: usize, stage: Stage) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(ExpansionError::Validation(format!("{stage} needs k of at least 1")));
        }

        let mut results = timeout(self.timeout, self.index.similarity_search(query, k))
            .await
            .map_err(|_| ExpansionError::timeout(stage, self.timeout))??;

        if let Some(bad) = results.iter().find(|r| !(0.0..=1.0).contains(&r.score)) {
            return Err(IndexError::InvalidScore(bad.score).into());
        }
        if results.len() > k {
            debug!("Index returned {} results for k={}, keeping the first {}", results.len(), k, k);
            results.truncate(k);
        }
        Ok(results)
    }
}
