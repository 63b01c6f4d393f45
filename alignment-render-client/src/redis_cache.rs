use crate::cache::{CacheError, CacheStore};
use crate::{Fingerprint, RenderedImage};
use async_trait::async_trait;
use chrono::Duration;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Cache store backed by Redis.
///
/// Entries are written with `SET .. EX`, so expiry is enforced by Redis.
pub struct RedisCache {
    connection: ConnectionManager,
    key_prefix: String,
}

impl RedisCache {
    /// Connect to `url`, e.g. `redis://localhost:6379/3`.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, CacheError> {
        let key_prefix = key_prefix.into();
        if key_prefix.is_empty() {
            return Err(CacheError::Unavailable(
                "redis key prefix must not be empty".to_string(),
            ));
        }
        let client = redis::Client::open(url).map_err(unavailable)?;
        let connection = ConnectionManager::new(client).await.map_err(unavailable)?;
        log::info!("Connected to redis cache at {}", url);

        Ok(Self {
            connection,
            key_prefix,
        })
    }

    fn redis_key(&self, key: &Fingerprint) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

fn unavailable(err: redis::RedisError) -> CacheError {
    CacheError::Unavailable(err.to_string())
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn exists(&self, key: &Fingerprint) -> Result<bool, CacheError> {
        // Empty values read as misses, so they do not count as present.
        let mut connection = self.connection.clone();
        let length: usize = redis::cmd("STRLEN")
            .arg(self.redis_key(key))
            .query_async(&mut connection)
            .await
            .map_err(unavailable)?;
        Ok(length > 0)
    }

    async fn get(&self, key: &Fingerprint) -> Result<RenderedImage, CacheError> {
        let mut connection = self.connection.clone();
        let value: Option<String> = connection
            .get(self.redis_key(key))
            .await
            .map_err(unavailable)?;

        let image = stored_image(value);
        match &image {
            Ok(_) => log::debug!("Cache hit for key: {}", key),
            Err(_) => log::debug!("Cache miss for key: {}", key),
        }
        image
    }

    async fn put(
        &self,
        key: &Fingerprint,
        image: RenderedImage,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        let seconds = ttl.num_seconds().max(1) as u64;
        redis::cmd("SET")
            .arg(self.redis_key(key))
            .arg(image.into_inner())
            .arg("EX")
            .arg(seconds)
            .query_async::<_, ()>(&mut connection)
            .await
            .map_err(unavailable)?;

        log::debug!("Stored in redis with key: {} (ttl {}s)", key, seconds);
        Ok(())
    }

    async fn clear(&self) -> Result<usize, CacheError> {
        let mut connection = self.connection.clone();
        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter = connection
                .scan_match::<_, String>(format!("{}*", self.key_prefix))
                .await
                .map_err(unavailable)?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }

        if keys.is_empty() {
            return Ok(0);
        }

        let removed: usize = connection.del(&keys).await.map_err(unavailable)?;
        log::info!("Removed {} entries from redis cache", removed);
        Ok(removed)
    }
}

fn stored_image(value: Option<String>) -> Result<RenderedImage, CacheError> {
    match value {
        Some(encoded) if !encoded.is_empty() => Ok(RenderedImage::new(encoded)),
        _ => Err(CacheError::NotFound),
    }
}
