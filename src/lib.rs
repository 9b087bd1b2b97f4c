

pub mod core;
pub mod expansion;
pub mod index;
pub mod llm;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use utils::{round_score, safe_truncate, safe_truncate_ellipsis};


pub use self::core::config::MultiQueryConfig;
pub use self::core::error::{ExpansionError, Result, Stage};
pub use expansion::{
    CandidateSet, ExpansionMode, ExpansionReport, PipelineSettings, QueryExpansionPipeline,
    ScoreTable, ScoredQuery,
};
pub use index::{Chunk, CorpusIndex, IndexError, InMemoryIndex, ScoredChunk};
pub use llm::embeddings::{EmbeddingGenerator, TextEmbedder};
pub use llm::providers::{LlmMetadata, LlmProvider, LlmProviderError};


pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";


pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";


pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";


pub const DEFAULT_LLM_MODEL: &str = "llama3.1:8b";

/// Result count requested from the index when the caller does not pick one.
pub const DEFAULT_K: usize = 4;

/// Paraphrases requested per seed query.
pub const EXPANSION_COUNT: usize = 4;


pub const DEFAULT_CACHE_SIZE: usize = 1000;


pub const DEFAULT_CACHE_TTL: u64 = 300;
