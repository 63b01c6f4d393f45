use crate::{Fingerprint, RenderedImage};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

/// Configuration for the cache system
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// How long a rendered image stays servable
    pub ttl: Duration,
    /// Maximum number of cached entries (in-memory store only)
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(60),
            max_entries: 1000,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self { ttl, max_entries }
    }
}

/// Errors returned by a [`CacheStore`].
///
/// `NotFound` is an ordinary miss; `Unavailable` means the store could not
/// answer at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("no cached image for this key")]
    NotFound,
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

/// Key/value store for rendered images, keyed by fingerprint.
///
/// Expiry belongs to the store: an expired entry must read as `NotFound`.
/// `put` may race with another `put` for the same key; the last write wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn exists(&self, key: &Fingerprint) -> Result<bool, CacheError>;

    async fn get(&self, key: &Fingerprint) -> Result<RenderedImage, CacheError>;

    async fn put(
        &self,
        key: &Fingerprint,
        image: RenderedImage,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Drop every entry owned by this store, returning how many were removed.
    async fn clear(&self) -> Result<usize, CacheError>;

    fn stats(&self) -> Option<CacheStats> {
        None
    }
}

/// Cached image with metadata
#[derive(Clone, Debug)]
pub struct CachedImage {
    pub data: RenderedImage,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CachedImage {
    pub fn new(data: RenderedImage, ttl: Duration) -> Self {
        Self {
            data,
            created_at: Utc::now(),
            ttl,
        }
    }

    /// Check if the cached image is still valid
    pub fn is_valid(&self) -> bool {
        Utc::now() < self.created_at + self.ttl
    }
}

/// In-memory cache implementation using DashMap for thread safety
pub struct MemoryCache {
    cache: DashMap<Fingerprint, CachedImage>,
    pub config: CacheConfig,
}

impl MemoryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            cache: DashMap::new(),
            config,
        }
    }

    /// Get cached image if available and valid
    fn lookup(&self, key: &Fingerprint) -> Option<RenderedImage> {
        let valid = self
            .cache
            .get(key)
            .and_then(|cached| cached.is_valid().then(|| cached.data.clone()));

        match valid {
            Some(data) => {
                log::debug!("Cache hit for key: {}", key);
                Some(data)
            }
            None => {
                // The shard guard from `get` is released by now, so removing is safe.
                if self.cache.remove_if(key, |_, cached| !cached.is_valid()).is_some() {
                    log::debug!("Cache expired for key: {}", key);
                } else {
                    log::debug!("Cache miss for key: {}", key);
                }
                None
            }
        }
    }

    /// Store image in cache
    fn store(&self, key: &Fingerprint, data: RenderedImage, ttl: Duration) {
        // Check if we need to evict old entries
        if !self.cache.contains_key(key) && self.cache.len() >= self.config.max_entries {
            self.evict_expired();

            // If still at capacity, remove oldest entries
            if self.cache.len() >= self.config.max_entries {
                self.evict_oldest();
            }
        }

        self.cache.insert(key.clone(), CachedImage::new(data, ttl));
        log::debug!("Stored in cache with key: {}", key);
    }

    /// Remove expired entries from cache
    pub fn evict_expired(&self) -> usize {
        let before = self.cache.len();
        self.cache.retain(|_, cached| cached.is_valid());
        let expired_count = before.saturating_sub(self.cache.len());

        log::debug!("Evicted {} expired cache entries", expired_count);
        expired_count
    }

    /// Remove oldest entries when at capacity
    fn evict_oldest(&self) {
        let mut entries: Vec<_> = self
            .cache
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().created_at))
            .collect();

        // Sort by creation time (oldest first)
        entries.sort_by_key(|(_, created_at)| *created_at);

        // Remove oldest 25% of entries
        let to_remove = (self.config.max_entries / 4).max(1);
        for (key, _) in entries.into_iter().take(to_remove) {
            self.cache.remove(&key);
        }

        log::debug!("Evicted {} oldest cache entries", to_remove);
    }

    #[cfg(test)]
    pub(crate) fn insert_entry(&self, key: Fingerprint, entry: CachedImage) {
        self.cache.insert(key, entry);
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn exists(&self, key: &Fingerprint) -> Result<bool, CacheError> {
        Ok(self.lookup(key).is_some())
    }

    async fn get(&self, key: &Fingerprint) -> Result<RenderedImage, CacheError> {
        self.lookup(key).ok_or(CacheError::NotFound)
    }

    async fn put(
        &self,
        key: &Fingerprint,
        image: RenderedImage,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.store(key, image, ttl);
        Ok(())
    }

    async fn clear(&self) -> Result<usize, CacheError> {
        let removed = self.cache.len();
        self.cache.clear();
        log::info!("Cache cleared");
        Ok(removed)
    }

    fn stats(&self) -> Option<CacheStats> {
        let total_entries = self.cache.len();
        let expired_entries = self
            .cache
            .iter()
            .filter(|entry| !entry.value().is_valid())
            .count();

        Some(CacheStats {
            total_entries,
            valid_entries: total_entries.saturating_sub(expired_entries),
            expired_entries,
            max_entries: self.config.max_entries,
        })
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub max_entries: usize,
}

/// Thread-safe handle to any cache store
pub type SharedCacheStore = Arc<dyn CacheStore>;
