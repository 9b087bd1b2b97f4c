

use std::sync::Arc;
use std::time::Duration;

use super::embeddings::EmbeddingGenerator;
use super::providers::base::LlmProvider;
use super::providers::fallback::LlmProviderWithFallback;
use super::providers::ollama::OllamaProvider;
use super::providers::openai::OpenAiProvider;
use crate::core::config::MultiQueryConfig;
use crate::core::error::{ExpansionError, Result};
use crate::DEFAULT_OLLAMA_URL;


pub struct LlmProviderFactory;

impl LlmProviderFactory {

    pub fn create(
        provider: &str,
        model: &str,
        api_key: Option<&str>,
        base_url: Option<&str>,
        temperature: f64,
        timeout: Duration,
    ) -> Result<Arc<dyn LlmProvider>> {
        let provider: Arc<dyn LlmProvider> = match provider {
            "openai" => Arc::new(OpenAiProvider::new(
                api_key.map(String::from),
                base_url,
                model,
                temperature,
                timeout,
            )?),
            "ollama" => Arc::new(OllamaProvider::new(
                base_url.unwrap_or(DEFAULT_OLLAMA_URL),
                model,
                temperature,
                timeout,
            )?),
            other => {
                return Err(ExpansionError::Config(format!(
                    "Unknown provider: {other}. Supported: openai, ollama"
                )))
            }
        };
        Ok(provider)
    }

    /// Build the configured provider, wrapped for local failover when enabled.
    pub fn from_config(config: &MultiQueryConfig) -> Result<Arc<dyn LlmProvider>> {
        let timeout = Duration::from_secs(config.llm_timeout_secs);
        let primary = Self::create(
            &config.llm_provider,
            &config.llm_model,
            config.llm_api_key.as_deref(),
            config.llm_base_url.as_deref(),
            config.llm_temperature,
            timeout,
        )?;

        if !config.llm_fallback_enabled {
            return Ok(primary);
        }

        Ok(Arc::new(LlmProviderWithFallback::new(
            primary,
            true,
            Some(config.llm_fallback_url.clone()),
            Some(config.llm_fallback_model.clone()),
            timeout,
        )))
    }
}


pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {

    pub fn from_config(config: &MultiQueryConfig) -> Result<EmbeddingGenerator> {
        EmbeddingGenerator::new(
            config.embedding_provider.clone(),
            Some(config.embedding_url.clone()),
            config.embedding_model.clone(),
            config.embedding_api_key.clone(),
            Duration::from_secs(config.embedding_timeout_secs),
            config.embedding_cache_size,
            config.embedding_cache_ttl_secs,
            config.embedding_fallback_enabled,
            Some(config.embedding_fallback_url.clone()),
            Some(config.embedding_fallback_model.clone()),
        )
        .map_err(|e| ExpansionError::Config(format!("embedding client: {e}")))
    }
}
