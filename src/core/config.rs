

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::error::{ExpansionError, Result};
use crate::expansion::config::PipelineSettings;
use crate::index::RelevanceMetric;
use crate::{DEFAULT_CACHE_SIZE, DEFAULT_CACHE_TTL, DEFAULT_EMBEDDING_MODEL, DEFAULT_K, DEFAULT_LLM_MODEL, DEFAULT_OLLAMA_URL};

const ENV_PREFIX: &str = "MULTIQUERY";

const SUPPORTED_LLM_PROVIDERS: &[&str] = &["ollama", "openai"];

const SUPPORTED_EMBEDDING_PROVIDERS: &[&str] = &["ollama", "openai"];


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiQueryConfig {

    pub llm_provider: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_temperature: f64,
    pub llm_timeout_secs: u64,


    pub llm_fallback_enabled: bool,
    pub llm_fallback_url: String,
    pub llm_fallback_model: String,


    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_timeout_secs: u64,
    pub embedding_cache_size: usize,
    pub embedding_cache_ttl_secs: u64,


    pub embedding_fallback_enabled: bool,
    pub embedding_fallback_url: String,
    pub embedding_fallback_model: String,

    /// Results averaged per candidate query.
    pub score_k: usize,
    /// Chunks retrieved for context-grounded generation.
    pub context_k: usize,
    pub index_timeout_secs: u64,
    pub concurrent_scoring: bool,
    pub relevance_metric: RelevanceMetric,
}

impl Default for MultiQueryConfig {
    fn default() -> Self {
        Self {
            llm_provider: "ollama".to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_api_key: None,
            llm_base_url: None,
            llm_temperature: 0.0,
            llm_timeout_secs: 60,

            llm_fallback_enabled: false,
            llm_fallback_url: DEFAULT_OLLAMA_URL.to_string(),
            llm_fallback_model: "llama3.2".to_string(),

            embedding_provider: "ollama".to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_url: DEFAULT_OLLAMA_URL.to_string(),
            embedding_api_key: None,
            embedding_timeout_secs: 30,
            embedding_cache_size: DEFAULT_CACHE_SIZE,
            embedding_cache_ttl_secs: DEFAULT_CACHE_TTL,

            embedding_fallback_enabled: false,
            embedding_fallback_url: DEFAULT_OLLAMA_URL.to_string(),
            embedding_fallback_model: DEFAULT_EMBEDDING_MODEL.to_string(),

            score_k: DEFAULT_K,
            context_k: DEFAULT_K,
            index_timeout_secs: 10,
            concurrent_scoring: true,
            relevance_metric: RelevanceMetric::default(),
        }
    }
}

impl MultiQueryConfig {

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay `MULTIQUERY_*` values returned by `lookup` onto the defaults.
    ///
    /// Values that fail to parse are ignored and the default is kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}_{name}"));
        let mut config = Self::default();

        if let Some(provider) = var("LLM_PROVIDER") {
            config.llm_provider = provider;
        }
        if let Some(model) = var("LLM_MODEL") {
            config.llm_model = model;
        }
        if let Some(key) = var("LLM_API_KEY") {
            config.llm_api_key = Some(key);
        }
        if let Some(url) = var("LLM_BASE_URL") {
            config.llm_base_url = Some(url);
        }
        if let Some(t) = var("LLM_TEMPERATURE").and_then(|v| v.parse().ok()) {
            config.llm_temperature = t;
        }
        if let Some(secs) = var("LLM_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.llm_timeout_secs = secs;
        }
        if let Some(enabled) = var("LLM_FALLBACK_ENABLED").and_then(|v| v.parse().ok()) {
            config.llm_fallback_enabled = enabled;
        }
        if let Some(url) = var("LLM_FALLBACK_URL") {
            config.llm_fallback_url = url;
        }
        if let Some(model) = var("LLM_FALLBACK_MODEL") {
            config.llm_fallback_model = model;
        }
        if let Some(provider) = var("EMBEDDING_PROVIDER") {
            config.embedding_provider = provider;
        }
        if let Some(model) = var("EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(url) = var("EMBEDDING_URL") {
            config.embedding_url = url;
        }
        if let Some(key) = var("EMBEDDING_API_KEY") {
            config.embedding_api_key = Some(key);
        }
        if let Some(secs) = var("EMBEDDING_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.embedding_timeout_secs = secs;
        }
        if let Some(size) = var("EMBEDDING_CACHE_SIZE").and_then(|v| v.parse().ok()) {
            config.embedding_cache_size = size;
        }
        if let Some(secs) = var("EMBEDDING_CACHE_TTL_SECS").and_then(|v| v.parse().ok()) {
            config.embedding_cache_ttl_secs = secs;
        }
        if let Some(enabled) = var("EMBEDDING_FALLBACK_ENABLED").and_then(|v| v.parse().ok()) {
            config.embedding_fallback_enabled = enabled;
        }
        if let Some(url) = var("EMBEDDING_FALLBACK_URL") {
            config.embedding_fallback_url = url;
        }
        if let Some(model) = var("EMBEDDING_FALLBACK_MODEL") {
            config.embedding_fallback_model = model;
        }
        if let Some(k) = var("SCORE_K").and_then(|v| v.parse().ok()) {
            config.score_k = k;
        }
        if let Some(k) = var("CONTEXT_K").and_then(|v| v.parse().ok()) {
            config.context_k = k;
        }
        if let Some(secs) = var("INDEX_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.index_timeout_secs = secs;
        }
        if let Some(concurrent) = var("CONCURRENT_SCORING").and_then(|v| v.parse().ok()) {
            config.concurrent_scoring = concurrent;
        }
        if let Some(metric) = var("RELEVANCE_METRIC").and_then(|v| v.parse().ok()) {
            config.relevance_metric = metric;
        }

        config.normalized()
    }

    /// Layer an optional config file (TOML, JSON or YAML) and the
    /// `MULTIQUERY_*` environment over the defaults, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }

        let config = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize::<Self>()?
            .normalized();

        config.validate()?;
        Ok(config)
    }


    /// Provider names are matched case-insensitively.
    fn normalized(mut self) -> Self {
        self.llm_provider = self.llm_provider.trim().to_lowercase();
        self.embedding_provider = self.embedding_provider.trim().to_lowercase();
        self
    }


    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_LLM_PROVIDERS.contains(&self.llm_provider.as_str()) {
            return Err(ExpansionError::Config(format!(
                "unknown LLM provider '{}', supported: {}",
                self.llm_provider,
                SUPPORTED_LLM_PROVIDERS.join(", ")
            )));
        }
        if !SUPPORTED_EMBEDDING_PROVIDERS.contains(&self.embedding_provider.as_str()) {
            return Err(ExpansionError::Config(format!(
                "unknown embedding provider '{}', supported: {}",
                self.embedding_provider,
                SUPPORTED_EMBEDDING_PROVIDERS.join(", ")
            )));
        }
        if self.llm_provider == "openai" && self.llm_api_key.is_none() && self.llm_base_url.is_none() {
            return Err(ExpansionError::Config(
                "llm_api_key is required for the hosted OpenAI endpoint".to_string(),
            ));
        }
        if self.embedding_provider == "openai" && self.embedding_api_key.is_none() {
            return Err(ExpansionError::Config(
                "embedding_api_key is required for OpenAI embeddings".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm_temperature) {
            return Err(ExpansionError::Config(format!(
                "llm_temperature must be within [0, 2], got {}",
                self.llm_temperature
            )));
        }
        if self.score_k == 0 || self.context_k == 0 {
            return Err(ExpansionError::Config("score_k and context_k must be positive".to_string()));
        }
        if self.llm_timeout_secs == 0 || self.index_timeout_secs == 0 || self.embedding_timeout_secs == 0 {
            return Err(ExpansionError::Config("timeouts must be positive".to_string()));
        }

        let mut urls = vec![
            ("embedding_url", self.embedding_url.as_str()),
            ("llm_fallback_url", self.llm_fallback_url.as_str()),
            ("embedding_fallback_url", self.embedding_fallback_url.as_str()),
        ];
        if let Some(base) = &self.llm_base_url {
            urls.push(("llm_base_url", base.as_str()));
        }
        for (name, value) in urls {
            Url::parse(value)
                .map_err(|e| ExpansionError::Config(format!("{name} '{value}' is not a valid URL: {e}")))?;
        }

        Ok(())
    }


    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            score_k: self.score_k,
            context_k: self.context_k,
            generation_timeout: Duration::from_secs(self.llm_timeout_secs),
            index_timeout: Duration::from_secs(self.index_timeout_secs),
            concurrent_scoring: self.concurrent_scoring,
        }
    }
}
