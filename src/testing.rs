//! Deterministic doubles for the model, the embedder and the index.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::index::{Chunk, CorpusIndex, IndexError, ScoredChunk};
use crate::llm::embeddings::{EmbeddingError, TextEmbedder};
use crate::llm::providers::base::{LlmMetadata, LlmProvider, LlmProviderError};

pub const SEED: &str = "How to catch fish USA";

pub struct FishingReplies;

impl FishingReplies {
    pub const PLAIN: [&'static str; 5] = [
        SEED,
        "What are the best fishing techniques in the United States?",
        "Where can I go fishing in the USA?",
        "Guide to catching fish in American lakes and rivers",
        "Fishing tips for beginners in the US",
    ];

    pub const CONTEXT: [&'static str; 5] = [
        SEED,
        "How to catch trout in US rivers",
        "Fishing license requirements in the United States",
        "Best bait for freshwater fishing in the USA",
        "Saltwater fishing regulations in Florida",
    ];
}

fn json_list(items: &[&str]) -> String {
    serde_json::to_string(items).unwrap()
}

type Responder = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Replies with whatever its responder returns for the user prompt.
pub struct ScriptedLlm {
    respond: Responder,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedLlm {
    pub fn constant(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::from_fn(move |_| reply.clone())
    }

    pub fn from_fn(respond: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            delay: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _response_format: Option<&str>,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock() = Some(user_prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let metadata = LlmMetadata {
            provider: "scripted".to_string(),
            model: "scripted-model".to_string(),
            ..Default::default()
        };
        Ok(((self.respond)(user_prompt), metadata))
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }

    fn temperature(&self) -> f64 {
        0.0
    }
}

pub struct FailingLlm;

#[async_trait]
impl LlmProvider for FailingLlm {
    async fn generate(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _response_format: Option<&str>,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        Err(LlmProviderError::Provider("model offline".to_string()))
    }

    fn provider_name(&self) -> &str {
        "failing"
    }

    fn model_name(&self) -> &str {
        "none"
    }

    fn temperature(&self) -> f64 {
        0.0
    }
}

/// Grounded replies whenever the prompt carries document excerpts.
pub fn fishing_llm() -> ScriptedLlm {
    ScriptedLlm::from_fn(|prompt| {
        if prompt.contains("**Document excerpts:**") {
            json_list(&FishingReplies::CONTEXT)
        } else {
            json_list(&FishingReplies::PLAIN)
        }
    })
}


/// Feature hashing of lowercase word tokens into a fixed number of buckets.
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn with_dims(dims: usize) -> Self {
        Self { dims }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::with_dims(256)
    }
}

#[async_trait]
impl TextEmbedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        let mut vector = vec![0.0f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            // FNV-1a
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for byte in token.to_lowercase().bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
            vector[(hash % self.dims as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        "hashing"
    }
}

pub fn fishing_corpus() -> Vec<Chunk> {
    vec![
        Chunk::new("Fly fishing for trout in mountain rivers works best with light tackle and small nymphs.")
            .with_source("rivers.md"),
        Chunk::new("Every US state requires anglers over sixteen to carry a valid fishing license.")
            .with_source("licensing.md"),
        Chunk::new("Live worms and minnows are reliable bait for bass and catfish in freshwater lakes.")
            .with_source("bait.md"),
        Chunk::new("Florida saltwater regulations set bag limits for snook, redfish and grouper.")
            .with_source("saltwater.md"),
    ]
}


/// Canned search results keyed by exact query text.
#[derive(Default)]
pub struct FixtureIndex {
    results: HashMap<String, Vec<ScoredChunk>>,
    requested: Mutex<Vec<usize>>,
}

impl FixtureIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scores(self, query: &str, scores: &[f64]) -> Self {
        let chunks = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| ScoredChunk {
                chunk: Chunk::new(format!("{query} passage {i}")),
                score,
            })
            .collect();
        self.with_chunks(query, chunks)
    }

    pub fn with_chunks(mut self, query: &str, chunks: Vec<ScoredChunk>) -> Self {
        self.results.insert(query.to_string(), chunks);
        self
    }

    /// `k` of every search so far, in call order.
    pub fn requested_k(&self) -> Vec<usize> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl CorpusIndex for FixtureIndex {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        self.requested.lock().push(k);
        Ok(self
            .results
            .get(query)
            .map(|chunks| chunks.iter().take(k).cloned().collect())
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

pub struct FailingIndex;

#[async_trait]
impl CorpusIndex for FailingIndex {
    async fn similarity_search(&self, _query: &str, _k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        Err(IndexError::Backend("connection refused".to_string()))
    }
}

pub struct SlowIndex(pub Duration);

#[async_trait]
impl CorpusIndex for SlowIndex {
    async fn similarity_search(&self, _query: &str, _k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        tokio::time::sleep(self.0).await;
        Ok(Vec::new())
    }
}

/// Seed scores average to 0.87913; grounded expansions outscore plain ones.
pub fn fishing_fixture_index() -> FixtureIndex {
    let seed_scores = [0.8841, 0.8802, 0.8773, 0.8749];
    let context = fishing_corpus()
        .into_iter()
        .zip(seed_scores)
        .map(|(chunk, score)| ScoredChunk { chunk, score })
        .collect();

    let plain = [0.86, 0.85, 0.84, 0.83];
    let grounded = [0.885, 0.88, 0.87, 0.80];

    let mut index = FixtureIndex::new().with_chunks(SEED, context);
    for (query, score) in FishingReplies::PLAIN[1..].iter().zip(plain) {
        index = index.with_scores(query, &[score; 4]);
    }
    for (query, score) in FishingReplies::CONTEXT[1..].iter().zip(grounded) {
        index = index.with_scores(query, &[score; 4]);
    }
    index
}


/// Answer exactly one HTTP request on a local port with `body` as JSON.
/// Returns the base URL to point a client at.
pub async fn serve_json_once(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        while !request_complete(&request) {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    format!("http://{addr}")
}

fn request_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some(end) = text.find("\r\n\r\n") else {
        return false;
    };
    let length = text[..end]
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= end + 4 + length
}
