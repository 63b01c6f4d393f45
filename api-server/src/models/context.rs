use super::config::{CacheBackend, Config};
use alignment_render_client::cache::{MemoryCache, SharedCacheStore};
use alignment_render_client::redis_cache::RedisCache;
use alignment_render_client::{Error, RenderClient};
use getset::Getters;
use log::info;
use std::sync::Arc;

#[derive(Getters)]
#[get = "pub"]
pub struct Context {
    render_client: RenderClient,
    config: Config,
}

impl Context {
    pub async fn new(config: Config) -> Result<Self, Error> {
        let client_config = config.client_config();
        let store: SharedCacheStore = match config.cache().backend() {
            CacheBackend::Memory => Arc::new(MemoryCache::new(client_config.cache.clone())),
            CacheBackend::Redis => Arc::new(
                RedisCache::connect(config.cache().redis_url(), config.cache().key_prefix())
                    .await?,
            ),
        };
        let render_client = RenderClient::with_store(&client_config, store)?;

        info!(
            "Initialized RenderClient with {} cache (TTL: {}min, renderer: {})",
            config.cache().backend(),
            config.cache().ttl_minutes(),
            config.renderer().url()
        );

        Ok(Self::from_parts(render_client, config))
    }

    pub fn from_parts(render_client: RenderClient, config: Config) -> Self {
        Self {
            render_client,
            config,
        }
    }
}

pub type ContextPointer = Arc<Context>;
