

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::DEFAULT_K;


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineSettings {
    /// Index results averaged per candidate query.
    pub score_k: usize,
    /// Index results handed to the model in context-grounded mode.
    pub context_k: usize,
    pub generation_timeout: Duration,
    /// Bound on each individual index query.
    pub index_timeout: Duration,
    pub concurrent_scoring: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            score_k: DEFAULT_K,
            context_k: DEFAULT_K,
            generation_timeout: Duration::from_secs(60),
            index_timeout: Duration::from_secs(10),
            concurrent_scoring: true,
        }
    }
}
