//! Query expansion: generate paraphrases of a seed query, score each against
//! the corpus, and return them ranked.

pub mod config;
pub mod generator;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod ranking;
pub mod scorer;

pub use config::PipelineSettings;
pub use generator::{Generation, QueryGenerator};
pub use models::{
    CandidateSet, ExpansionMode, ExpansionReport, PipelineState, ScoreTable, ScoredQuery,
};
pub use parser::{parse_candidates, ParseError};
pub use pipeline::QueryExpansionPipeline;
pub use ranking::RankingAssembler;
pub use scorer::{mean_relevance, RelevanceScorer};
