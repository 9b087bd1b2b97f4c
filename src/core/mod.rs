

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheStats, EmbeddingCache};
pub use config::MultiQueryConfig;
pub use error::{ExpansionError, Result, Stage};
