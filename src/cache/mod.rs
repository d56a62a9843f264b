//! Caching module for offer-gateway
//!
//! Search and detail responses are cached as serialized bytes under a
//! digest of the canonical request, each entry with its own time to live.

use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Key-value store with per-entry expiration
#[async_trait]
pub trait TtlCache: Send + Sync {
    /// Fetch a live entry
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store an entry that expires after `ttl`
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
}

#[derive(Clone)]
struct Entry {
    bytes: Arc<[u8]>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache for serialized responses
pub struct MemoryCache {
    cache: Cache<String, Entry>,
}

impl MemoryCache {
    /// Create a new cache holding at most `max_capacity` entries
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { cache }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl TtlCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.cache.get(key).await.map(|entry| entry.bytes.to_vec()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let entry = Entry {
            bytes: Arc::from(value),
            ttl,
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }
}

/// Cache key of a canonical request string (SHA-256, lowercase hex)
pub fn cache_key(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryCache::new(100);
        cache
            .set("test", vec![1, 2, 3], Duration::from_secs(60))
            .await
            .unwrap();

        let result = cache.get("test").await.unwrap();
        assert_eq!(result, Some(vec![1, 2, 3]));
        assert_eq!(cache.get("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entries_expire_individually() {
        let cache = MemoryCache::new(100);
        cache
            .set("short", b"a".to_vec(), Duration::from_millis(50))
            .await
            .unwrap();
        cache
            .set("long", b"b".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.get("short").await.unwrap(), None);
        assert_eq!(cache.get("long").await.unwrap(), Some(b"b".to_vec()));
    }

    #[tokio::test]
    async fn test_overwrite_resets_ttl() {
        let cache = MemoryCache::new(100);
        cache.set("k", b"old".to_vec(), Duration::from_millis(50)).await.unwrap();
        cache.set("k", b"new".to_vec(), Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get("k").await.unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn test_cache_key_is_sha256_hex() {
        assert_eq!(
            cache_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(cache_key("trending"), cache_key("trending"));
        assert_ne!(cache_key("trending"), cache_key("trending:can"));
    }
}
