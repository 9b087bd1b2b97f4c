

pub mod embeddings;
pub mod factory;
pub mod providers;

pub use embeddings::{EmbeddingError, EmbeddingGenerator, TextEmbedder};
pub use factory::{EmbeddingProviderFactory, LlmProviderFactory};
pub use providers::{LlmMetadata, LlmProvider, LlmProviderError};
