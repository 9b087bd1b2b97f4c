use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};


/// Bounded embedding cache keyed by model and text.
pub struct EmbeddingCache {
    cache: Mutex<LruCache<String, (Vec<f32>, Instant)>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub hit_rate: f64,
}

impl EmbeddingCache {
    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl: Duration::from_secs(ttl_secs),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, model: &str, text: &str) -> Option<Vec<f32>> {
        let key = Self::make_key(model, text);
        let mut cache = self.cache.lock();

        let lookup = cache
            .get(&key)
            .map(|(embedding, created_at)| (created_at.elapsed() < self.ttl).then(|| embedding.clone()));

        let fresh = match lookup {
            Some(Some(embedding)) => Some(embedding),
            Some(None) => {
                cache.pop(&key);
                None
            }
            None => None,
        };

        match fresh {
            Some(embedding) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(embedding)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, model: &str, text: &str, embedding: Vec<f32>) {
        let mut cache = self.cache.lock();
        cache.put(Self::make_key(model, text), (embedding, Instant::now()));
    }

    pub fn make_key(model: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 { hits as f64 / total as f64 } else { 0.0 };

        CacheStats {
            hits,
            misses,
            size: self.len(),
            hit_rate,
        }
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}
