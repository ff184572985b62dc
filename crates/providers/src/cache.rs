//! In-memory cache for provider HTTP responses.
//!
//! Bodies are keyed by a canonical request string (see
//! [`crate::http::cache_key`]) so repeated lookups at nearly the same point
//! skip the network. Entries are evicted least-recently-used once
//! `max_entries` is reached and dropped lazily on read after their TTL.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

struct Entry {
    status: u16,
    body: Bytes,
    stored: Instant,
}

/// Counters since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Entries found past their TTL.
    pub expired: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Percentage of lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            lookups => self.hits as f64 * 100.0 / lookups as f64,
        }
    }
}

struct Inner {
    entries: LruCache<String, Entry>,
    stats: CacheStats,
}

/// LRU cache of `(status, body)` pairs with a fixed TTL.
pub struct ResponseCache {
    inner: Mutex<Inner>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(max_entries: usize, ttl_secs: u64) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        info!(max_entries = capacity.get(), ttl_secs, "Response cache enabled");

        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    pub async fn get(&self, key: &str) -> Option<(u16, Bytes)> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let cached = inner
            .entries
            .get(key)
            .map(|entry| (entry.stored.elapsed() <= self.ttl, entry.status, entry.body.clone()));

        let fresh = match cached {
            Some((true, status, body)) => Some((status, body)),
            Some((false, ..)) => {
                inner.entries.pop(key);
                inner.stats.expired += 1;
                None
            }
            None => None,
        };

        match fresh {
            Some(_) => inner.stats.hits += 1,
            None => inner.stats.misses += 1,
        }
        inner.stats.entries = inner.entries.len();
        fresh
    }

    pub async fn put(&self, key: String, status: u16, body: Bytes) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let entry = Entry {
            status,
            body,
            stored: Instant::now(),
        };

        // `push` hands back the displaced pair: the old value for the same
        // key, or the LRU entry when at capacity.
        if let Some((displaced, _)) = inner.entries.push(key.clone(), entry) {
            if displaced != key {
                inner.stats.evictions += 1;
                debug!(key = %displaced, "Evicted cached response");
            }
        }
        inner.stats.entries = inner.entries.len();
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.lock().await.stats
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let dropped = inner.entries.len();
        inner.entries.clear();
        inner.stats.entries = 0;
        info!(dropped, "Response cache cleared");
    }
}
