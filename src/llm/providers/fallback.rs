

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::base::{LlmMetadata, LlmProvider, LlmProviderError};
use super::ollama::OllamaProvider;

const DEFAULT_FALLBACK_MODEL: &str = "llama3.2";


/// Routes calls to a local Ollama model when the primary provider fails.
pub struct LlmProviderWithFallback {
    primary: Arc<dyn LlmProvider>,
    fallback_enabled: bool,
    fallback_url: String,
    fallback_model: String,
    timeout: Duration,
    fallback_provider: RwLock<Option<Arc<OllamaProvider>>>,
    using_fallback: AtomicBool,
    fallback_count: AtomicUsize,
    primary_failures: AtomicUsize,
}

impl LlmProviderWithFallback {

    pub fn new(
        primary: Arc<dyn LlmProvider>,
        fallback_enabled: bool,
        fallback_url: Option<String>,
        fallback_model: Option<String>,
        timeout: Duration,
    ) -> Self {
        let fallback_url = fallback_url.unwrap_or_else(|| crate::DEFAULT_OLLAMA_URL.to_string());
        let fallback_model = fallback_model.unwrap_or_else(|| DEFAULT_FALLBACK_MODEL.to_string());

        info!(
            "LlmProviderWithFallback initialized: primary={}, fallback={}/{} (enabled={})",
            primary.provider_name(),
            fallback_url,
            fallback_model,
            fallback_enabled
        );

        Self {
            primary,
            fallback_enabled,
            fallback_url,
            fallback_model,
            timeout,
            fallback_provider: RwLock::new(None),
            using_fallback: AtomicBool::new(false),
            fallback_count: AtomicUsize::new(0),
            primary_failures: AtomicUsize::new(0),
        }
    }


    async fn fallback_provider(&self) -> Result<Arc<OllamaProvider>, LlmProviderError> {
        if let Some(provider) = self.fallback_provider.read().await.as_ref() {
            return Ok(Arc::clone(provider));
        }

        let mut guard = self.fallback_provider.write().await;
        if let Some(provider) = guard.as_ref() {
            return Ok(Arc::clone(provider));
        }

        // Same temperature as the primary so rankings stay comparable.
        let provider = Arc::new(OllamaProvider::new(
            self.fallback_url.clone(),
            self.fallback_model.clone(),
            self.primary.temperature(),
            self.timeout,
        )?);
        *guard = Some(Arc::clone(&provider));
        info!("Fallback provider initialized: {}/{}", self.fallback_url, self.fallback_model);
        Ok(provider)
    }


    async fn fallback_generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_format: Option<&str>,
        original_error: &LlmProviderError,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        warn!(
            "Falling back to Ollama ({}/{}) due to: {}",
            self.fallback_url, self.fallback_model, original_error
        );

        let both_failed = |e: LlmProviderError| LlmProviderError::BothFailed(original_error.to_string(), e.to_string());

        let fallback = self.fallback_provider().await.map_err(both_failed)?;
        let (content, mut metadata) = fallback
            .generate(system_prompt, user_prompt, response_format)
            .await
            .map_err(both_failed)?;

        metadata.fallback_used = true;
        metadata.original_provider = Some(self.primary.provider_name().to_string());
        metadata.original_error = Some(original_error.to_string());

        self.using_fallback.store(true, Ordering::SeqCst);
        self.fallback_count.fetch_add(1, Ordering::SeqCst);

        info!(
            "Fallback successful! total_fallbacks={}",
            self.fallback_count.load(Ordering::SeqCst)
        );

        Ok((content, metadata))
    }


    pub fn is_using_fallback(&self) -> bool {
        self.using_fallback.load(Ordering::SeqCst)
    }


    pub fn fallback_count(&self) -> usize {
        self.fallback_count.load(Ordering::SeqCst)
    }


    pub fn primary_failures(&self) -> usize {
        self.primary_failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for LlmProviderWithFallback {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_format: Option<&str>,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        match self.primary.generate(system_prompt, user_prompt, response_format).await {
            Ok(reply) => {
                self.using_fallback.store(false, Ordering::SeqCst);
                self.primary_failures.store(0, Ordering::SeqCst);
                Ok(reply)
            }
            Err(e) => {
                let failures = self.primary_failures.fetch_add(1, Ordering::SeqCst) + 1;
                warn!("Primary LLM provider failed ({}x): {}", failures, e);

                if self.fallback_enabled {
                    self.fallback_generate(system_prompt, user_prompt, response_format, &e).await
                } else {
                    Err(e)
                }
            }
        }
    }

    fn provider_name(&self) -> &str {
        if self.is_using_fallback() {
            "ollama (fallback)"
        } else {
            self.primary.provider_name()
        }
    }

    fn model_name(&self) -> &str {
        if self.is_using_fallback() {
            &self.fallback_model
        } else {
            self.primary.model_name()
        }
    }

    fn temperature(&self) -> f64 {
        self.primary.temperature()
    }
}
