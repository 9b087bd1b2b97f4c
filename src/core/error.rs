

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use thiserror::Error;

use crate::expansion::parser::ParseError;
use crate::index::IndexError;
use crate::llm::providers::base::LlmProviderError;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Generation,
    ContextRetrieval,
    Scoring,
}


#[derive(Error, Debug)]
pub enum ExpansionError {
    #[error("Malformed generation: {0}")]
    MalformedGeneration(#[from] ParseError),

    #[error("Corpus index unavailable: {0}")]
    IndexUnavailable(#[from] IndexError),

    #[error("Language model unavailable: {0}")]
    ModelUnavailable(#[from] LlmProviderError),

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExpansionError {
    pub fn timeout(stage: Stage, after: Duration) -> Self {
        Self::Timeout { stage, after }
    }

    /// Whether repeating the same call may succeed.
    ///
    /// Model replies vary between calls and timeouts are transient; a broken
    /// index, a failing provider or bad input stay broken.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::MalformedGeneration(_) | Self::Timeout { .. })
    }

    /// Short machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedGeneration(_) => "malformed_generation",
            Self::IndexUnavailable(_) => "index_unavailable",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::Timeout { .. } => "timeout",
            Self::Validation(_) => "validation",
            Self::Config(_) => "config",
        }
    }
}

impl From<config::ConfigError> for ExpansionError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}


pub type Result<T> = std::result::Result<T, ExpansionError>;
