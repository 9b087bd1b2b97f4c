

use std::collections::HashSet;

use futures::future::try_join_all;
use tracing::debug;

use super::models::{CandidateSet, ScoreTable};
use super::scorer::RelevanceScorer;
use crate::core::error::Result;


/// Scores every candidate and orders them best first.
pub struct RankingAssembler {
    concurrent: bool,
}

impl RankingAssembler {
    pub fn new(concurrent: bool) -> Self {
        Self { concurrent }
    }


    pub async fn rank(&self, candidates: &CandidateSet, scorer: &RelevanceScorer, k: usize) -> Result<ScoreTable> {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = candidates.iter().filter(|q| seen.insert(*q)).collect();
        if unique.len() < candidates.len() {
            debug!("{} duplicate candidates collapsed", candidates.len() - unique.len());
        }

        let scores = if self.concurrent {
            try_join_all(unique.iter().map(|q| scorer.score(q, k))).await?
        } else {
            let mut scores = Vec::with_capacity(unique.len());
            for q in &unique {
                scores.push(scorer.score(q, k).await?);
            }
            scores
        };

        let table = ScoreTable::from_scores(
            unique
                .into_iter()
                .map(String::from)
                .zip(scores),
        );
        debug!("Ranked {} queries, top={:?}", table.len(), table.top().map(|e| e.score));
        Ok(table)
    }
}
