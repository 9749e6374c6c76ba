use async_trait::async_trait;
use condense_core::{CompressedContext, CompressionOptions};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

const DEFAULT_MAX_ENTRIES: usize = 1_000;

/// Where assembled contexts are remembered between calls.
///
/// A miss is always acceptable: implementations need not persist across
/// restarts or be shared between processes.
#[async_trait]
pub trait ContextCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<CompressedContext>;

    /// `None` uses the implementation's default TTL
    async fn set(&self, key: String, value: CompressedContext, ttl: Option<Duration>);

    async fn clear(&self);

    /// Live (unexpired) entries
    async fn size(&self) -> usize;
}

/// Cache key signature of one compression request
pub struct CacheKey;

impl CacheKey {
    pub fn for_request(
        user_id: &str,
        thread_id: &str,
        session_id: Option<&str>,
        options: &CompressionOptions,
    ) -> String {
        // JSON array so ids containing separators cannot collide
        let parts = serde_json::json!([
            user_id,
            thread_id,
            session_id,
            options.level.as_str(),
            options.max_recent_messages,
            options.relevance_threshold,
            options.current_intent,
        ]);
        format!("context:{parts}")
    }
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-process TTL cache
#[derive(Debug)]
pub struct MemoryCache<V = CompressedContext> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    default_ttl: Duration,
    max_entries: usize,
}

impl<V: Clone + Send + Sync + 'static> MemoryCache<V> {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// Expired entries are evicted on the way out
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        // Another writer may have refreshed it in between
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone())
    }

    pub async fn set(&self, key: String, value: V, ttl: Option<Duration>) {
        let now = Instant::now();
        let expires_at = now + ttl.unwrap_or(self.default_ttl);

        let mut entries = self.entries.write().await;
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            entries.retain(|_, e| e.is_live(now));
            if entries.len() >= self.max_entries {
                let soonest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(soonest) = soonest {
                    entries.remove(&soonest);
                }
            }
        }
        entries.insert(key, Entry { value, expires_at });
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn size(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    /// Drop every expired entry, returning how many went
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }

    /// Periodically purge expired entries until the cache is dropped
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let purged = cache.purge_expired().await;
                if purged > 0 {
                    tracing::debug!(purged, "swept expired cache entries");
                }
            }
        })
    }
}

impl<V: Clone + Send + Sync + 'static> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContextCache for MemoryCache<CompressedContext> {
    async fn get(&self, key: &str) -> Option<CompressedContext> {
        MemoryCache::get(self, key).await
    }

    async fn set(&self, key: String, value: CompressedContext, ttl: Option<Duration>) {
        MemoryCache::set(self, key, value, ttl).await
    }

    async fn clear(&self) {
        MemoryCache::clear(self).await
    }

    async fn size(&self) -> usize {
        MemoryCache::size(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use condense_core::CompressionLevel;

    #[tokio::test]
    async fn test_set_get_clear() {
        let cache: MemoryCache<String> = MemoryCache::new();
        assert_eq!(cache.get("k").await, None);

        cache.set("k".to_string(), "v".to_string(), None).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        assert_eq!(cache.size().await, 1);

        cache.clear().await;
        assert_eq!(cache.size().await, 0);
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_read_as_absent() {
        let cache: MemoryCache<u32> = MemoryCache::with_ttl(Duration::from_secs(60));
        cache.set("short".to_string(), 1, Some(Duration::from_secs(1))).await;
        cache.set("long".to_string(), 2, None).await;

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("short").await, None);
        assert_eq!(cache.get("long").await, Some(2));
        assert_eq!(cache.size().await, 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cache.get("long").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache: MemoryCache<u32> = MemoryCache::with_ttl(Duration::from_secs(10));
        for i in 0..4 {
            cache.set(format!("k{i}"), i, None).await;
        }
        cache.set("keep".to_string(), 9, Some(Duration::from_secs(100))).await;

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.purge_expired().await, 4);
        assert_eq!(cache.get("keep").await, Some(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_in_background() {
        let cache: Arc<MemoryCache<u32>> = Arc::new(MemoryCache::with_ttl(Duration::from_secs(1)));
        cache.set("k".to_string(), 1, None).await;
        let sweeper = cache.spawn_sweeper(Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(cache.entries.read().await.is_empty());
        sweeper.abort();
    }

    #[tokio::test]
    async fn test_bounded_size_evicts_soonest_expiry() {
        let cache: MemoryCache<u32> = MemoryCache::new().with_max_entries(2);
        cache.set("a".to_string(), 1, Some(Duration::from_secs(10))).await;
        cache.set("b".to_string(), 2, Some(Duration::from_secs(100))).await;
        cache.set("c".to_string(), 3, Some(Duration::from_secs(100))).await;

        assert_eq!(cache.size().await, 2);
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("c").await, Some(3));

        // Overwriting an existing key never evicts
        cache.set("b".to_string(), 20, None).await;
        assert_eq!(cache.get("c").await, Some(3));
        assert_eq!(cache.get("b").await, Some(20));
    }

    #[test]
    fn test_cache_key_is_deterministic_and_discriminating() {
        let options = CompressionOptions::default();
        let a = CacheKey::for_request("u1", "t1", None, &options);
        assert_eq!(a, CacheKey::for_request("u1", "t1", None, &options));
        assert_ne!(a, CacheKey::for_request("u1", "t1", Some("s1"), &options));
        assert_ne!(a, CacheKey::for_request("u1", "t2", None, &options));

        let minimal = CompressionOptions::for_level(CompressionLevel::Minimal);
        assert_ne!(a, CacheKey::for_request("u1", "t1", None, &minimal));

        // force_refresh is not part of the signature
        let forced = options.clone().with_force_refresh(true);
        assert_eq!(a, CacheKey::for_request("u1", "t1", None, &forced));
    }

    #[test]
    fn test_cache_key_separators_cannot_collide() {
        let options = CompressionOptions::default();
        assert_ne!(
            CacheKey::for_request("u:1", "t", None, &options),
            CacheKey::for_request("u", "1:t", None, &options)
        );
    }
}
