use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use super::parser::ParseError;
use crate::index::ScoredChunk;
use crate::llm::providers::LlmMetadata;
use crate::EXPANSION_COUNT;


/// Which pipeline produces the expansions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, IntoStaticStr)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionMode {
    /// Paraphrase the seed with no retrieval beforehand.
    #[default]
    #[strum(to_string = "plain")]
    Plain,
    /// Retrieve chunks for the seed first and keep paraphrases within their topics.
    #[strum(to_string = "context_grounded", serialize = "context", serialize = "context-grounded")]
    ContextGrounded,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Pending,
    Complete,
    Failed,
}


/// The seed query followed by exactly [`EXPANSION_COUNT`] generated paraphrases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CandidateSet {
    queries: Vec<String>,
}

impl CandidateSet {
    pub const SIZE: usize = EXPANSION_COUNT + 1;

    /// Validate `queries` as a candidate set for `seed`. Surrounding
    /// whitespace is trimmed from every element.
    pub fn try_new(seed: &str, queries: Vec<String>) -> Result<Self, ParseError> {
        let queries: Vec<String> = queries.into_iter().map(|q| q.trim().to_string()).collect();
        if queries.len() != Self::SIZE {
            return Err(ParseError::WrongCardinality {
                expected: Self::SIZE,
                found: queries.len(),
            });
        }
        if let Some(index) = queries.iter().position(|q| q.is_empty()) {
            return Err(ParseError::EmptyElement { index });
        }
        if queries[0] != seed.trim() {
            return Err(ParseError::SeedMismatch {
                expected: seed.to_string(),
                found: queries[0].clone(),
            });
        }
        Ok(Self { queries })
    }


    pub fn seed(&self) -> &str {
        &self.queries[0]
    }


    pub fn expansions(&self) -> &[String] {
        &self.queries[1..]
    }


    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(String::as_str)
    }


    pub fn len(&self) -> usize {
        self.queries.len()
    }


    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }


    pub fn into_vec(self) -> Vec<String> {
        self.queries
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredQuery {
    pub query: String,
    pub score: f64,
}


/// Candidate queries keyed by text, iterated best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScoreTable {
    entries: Vec<ScoredQuery>,
}

impl ScoreTable {
    /// Build from `(query, score)` pairs in candidate order.
    ///
    /// A repeated query keeps its first occurrence. Sorting is stable, so equal
    /// scores keep candidate order.
    pub fn from_scores(scores: impl IntoIterator<Item = (String, f64)>) -> Self {
        let mut seen = HashSet::new();
        let mut entries: Vec<ScoredQuery> = scores
            .into_iter()
            .filter(|(query, _)| seen.insert(query.clone()))
            .map(|(query, score)| ScoredQuery { query, score })
            .collect();

        entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        Self { entries }
    }


    pub fn get(&self, query: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.query == query).map(|e| e.score)
    }


    pub fn contains(&self, query: &str) -> bool {
        self.get(query).is_some()
    }


    pub fn top(&self) -> Option<&ScoredQuery> {
        self.entries.first()
    }


    pub fn iter(&self) -> std::slice::Iter<'_, ScoredQuery> {
        self.entries.iter()
    }


    pub fn scores(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.score).collect()
    }


    pub fn len(&self) -> usize {
        self.entries.len()
    }


    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }


    pub fn into_vec(self) -> Vec<ScoredQuery> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a ScoreTable {
    type Item = &'a ScoredQuery;
    type IntoIter = std::slice::Iter<'a, ScoredQuery>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for ScoreTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{:.5}  {}", entry.score, entry.query)?;
        }
        Ok(())
    }
}


#[derive(Debug, Clone, Serialize)]
pub struct ExpansionReport {
    pub run_id: Uuid,
    pub mode: ExpansionMode,
    pub state: PipelineState,
    pub seed: String,
    pub candidates: CandidateSet,
    /// Chunks the expansions were grounded on; empty in plain mode.
    pub context: Vec<ScoredChunk>,
    pub table: ScoreTable,
    pub llm: LlmMetadata,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
