

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::cache::{CacheStats, EmbeddingCache};
use crate::{DEFAULT_EMBEDDING_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_URL};


#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty text")]
    EmptyText,

    #[error("Provider not implemented: {0}")]
    NotImplemented(String),

    #[error("Both primary and fallback failed: primary={0}, fallback={1}")]
    BothFailed(String, String),
}


/// Turns text into a dense vector.
#[async_trait]
pub trait TextEmbedder: Send + Sync {

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;


    fn model_name(&self) -> &str;
}


#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OpenAIEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}


pub struct EmbeddingGenerator {
    provider: String,
    url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
    cache: EmbeddingCache,

    fallback_enabled: bool,
    fallback_url: String,
    fallback_model: String,
    using_fallback: AtomicBool,
    fallback_count: AtomicUsize,
}

impl EmbeddingGenerator {

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: impl Into<String>,
        url: Option<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        cache_size: usize,
        cache_ttl: u64,
        fallback_enabled: bool,
        fallback_url: Option<String>,
        fallback_model: Option<String>,
    ) -> Result<Self, EmbeddingError> {
        let provider = provider.into().to_lowercase();
        let model = model.into();
        let default_url = if provider == "openai" { DEFAULT_OPENAI_URL } else { DEFAULT_OLLAMA_URL };
        let url = url
            .unwrap_or_else(|| default_url.to_string())
            .trim_end_matches('/')
            .to_string();

        info!(
            "EmbeddingGenerator initialized: provider={}, model={}, cache={}",
            provider, model, cache_size
        );

        Ok(Self {
            provider,
            url,
            model,
            api_key,
            client: Client::builder().timeout(timeout).build()?,
            cache: EmbeddingCache::new(cache_size, cache_ttl),
            fallback_enabled,
            fallback_url: fallback_url.unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            fallback_model: fallback_model.unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            using_fallback: AtomicBool::new(false),
            fallback_count: AtomicUsize::new(0),
        })
    }


    pub async fn generate(&self, text: &str, use_cache: bool) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        if use_cache {
            if let Some(cached) = self.cache.get(&self.model, text) {
                debug!("Cache HIT for: {}...", crate::safe_truncate(text, 50));
                return Ok(cached);
            }
        }

        let result = match self.provider.as_str() {
            "ollama" => self.request_ollama(&self.url, &self.model, text).await,
            "openai" => self.request_openai(text).await,
            other => Err(EmbeddingError::NotImplemented(other.to_string())),
        };

        // Vectors are cached under the model that produced them, so a fallback
        // vector is never served for a primary-model lookup.
        let (embedding, produced_by) = match result {
            Ok(embedding) => {
                self.using_fallback.store(false, Ordering::SeqCst);
                (embedding, &self.model)
            }
            Err(e) if self.fallback_enabled && self.provider != "ollama" => {
                debug!("Primary embedding provider unavailable, trying fallback: {}", e);
                (self.fallback_to_ollama(text, &e).await?, &self.fallback_model)
            }
            Err(e) => return Err(e),
        };

        if embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse("Empty embedding vector".to_string()));
        }

        if use_cache {
            self.cache.set(produced_by, text, embedding.clone());
        }
        Ok(embedding)
    }

    async fn request_ollama(&self, url: &str, model: &str, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", url))
            .json(&OllamaEmbeddingRequest { model, prompt: text })
            .send()
            .await?
            .error_for_status()?
            .json::<OllamaEmbeddingResponse>()
            .await?;

        Ok(response.embedding)
    }

    async fn request_openai(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EmbeddingError::InvalidResponse("API key required".to_string()))?;

        let response = self
            .client
            .post(format!("{}/embeddings", self.url))
            .bearer_auth(api_key)
            .json(&OpenAIEmbeddingRequest { model: &self.model, input: text })
            .send()
            .await?
            .error_for_status()?
            .json::<OpenAIEmbeddingResponse>()
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))
    }

    async fn fallback_to_ollama(&self, text: &str, original_error: &EmbeddingError) -> Result<Vec<f32>, EmbeddingError> {
        info!(
            "Using fallback Ollama ({}/{}) - primary unavailable",
            self.fallback_url, self.fallback_model
        );

        let embedding = self
            .request_ollama(&self.fallback_url, &self.fallback_model, text)
            .await
            .map_err(|e| EmbeddingError::BothFailed(original_error.to_string(), e.to_string()))?;

        self.using_fallback.store(true, Ordering::SeqCst);
        self.fallback_count.fetch_add(1, Ordering::SeqCst);

        info!(
            "Fallback successful! dims={}, total_fallbacks={}",
            embedding.len(),
            self.fallback_count.load(Ordering::SeqCst)
        );

        Ok(embedding)
    }


    pub fn is_using_fallback(&self) -> bool {
        self.using_fallback.load(Ordering::SeqCst)
    }


    pub fn fallback_count(&self) -> usize {
        self.fallback_count.load(Ordering::SeqCst)
    }


    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }


    pub fn provider(&self) -> &str {
        &self.provider
    }
}

#[async_trait]
impl TextEmbedder for EmbeddingGenerator {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.generate(text, true).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
