use crate::UnfurlRaw;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const DEFAULT_CACHE_CAPACITY: usize = 1000;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStrategy {
    #[default]
    UseCache,
    NoCache,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: UnfurlRaw,
    created_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() < ttl
    }
}

/// Shared URL → unfurl result store.
///
/// Bounded by entry count (least recently used goes first) and by age: an
/// entry older than the ttl is reported as absent and dropped on the next
/// lookup or [`UnfurlCache::purge_expired`]. Concurrent misses for the same URL
/// are not coalesced; each caller may scrape and `put`, and the last write wins.
#[derive(Clone)]
pub struct UnfurlCache {
    entries: Arc<Mutex<LruCache<String, CacheEntry>>>,
    ttl: Duration,
}

impl Default for UnfurlCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)
    }
}

impl UnfurlCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, url: &str) -> Option<UnfurlRaw> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(url) {
            Some(entry) if entry.is_fresh(self.ttl) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(url);
        }
        None
    }

    /// Stores `value` under `url`, replacing any previous entry and resetting its age.
    pub async fn put(&self, url: impl Into<String>, value: UnfurlRaw) {
        let entry = CacheEntry {
            value,
            created_at: Instant::now(),
        };
        self.entries.lock().await.put(url.into(), entry);
    }

    pub async fn invalidate(&self, url: &str) -> Option<UnfurlRaw> {
        self.entries.lock().await.pop(url).map(|entry| entry.value)
    }

    /// Drops every entry past its ttl and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let stale: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(self.ttl))
            .map(|(url, _)| url.clone())
            .collect();
        for url in &stale {
            entries.pop(url);
        }
        stale.len()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Physical entry count, including entries that have expired but not been reclaimed.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
