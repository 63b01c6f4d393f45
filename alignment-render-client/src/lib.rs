pub mod cache;
pub mod deduplication;
pub mod dispatcher;
mod error;
mod fingerprint;
mod image;
#[cfg(feature = "redis")]
pub mod redis_cache;
mod render_request;


use cache::{CacheError, MemoryCache, SharedCacheStore};
use chrono::Duration;
use deduplication::{
    ComputationOutcome, Completion, Registration, RequestDeduplicator, SharedRequestDeduplicator,
};
use dispatcher::http::HttpDispatcher;
use dispatcher::SharedRenderDispatcher;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

pub use error::Error;
pub use error::ErrorKind;
pub use fingerprint::Fingerprint;
pub use image::RenderedImage;
pub use render_request::alignment_type::AlignmentType;
pub use render_request::invalid_request_error::{InvalidRequestError, RequestField};
pub use render_request::render_options::RenderOptions;
pub use render_request::RenderRequest;

// Re-export cache types
pub use cache::{CacheConfig, CacheStats, CacheStore};
pub use deduplication::DeduplicationStats;
pub use dispatcher::{DispatcherConfig, RenderDispatcher, UpstreamError};

#[cfg(feature = "graphql")]
use async_graphql::{Enum, SimpleObject};

/// Everything needed to build a [`RenderClient`]. Built once at startup.
#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    pub cache: CacheConfig,
    pub dispatcher: DispatcherConfig,
}

/// Answer to [`RenderClient::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The image was already cached.
    ServedFromCache {
        fingerprint: Fingerprint,
        image: RenderedImage,
    },
    /// The image is being computed; poll with the fingerprint.
    Pending(Fingerprint),
}

impl Submission {
    pub fn fingerprint(&self) -> &Fingerprint {
        match self {
            Submission::ServedFromCache { fingerprint, .. } => fingerprint,
            Submission::Pending(fingerprint) => fingerprint,
        }
    }
}

/// Answer to [`RenderClient::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    Cached(RenderedImage),
    Pending,
    NotFound,
}

/// Lifecycle of a fingerprint as seen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(Enum))]
pub enum FingerprintState {
    NoEntry,
    Computing,
    Cached,
}

#[derive(Default)]
struct Counters {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    renders_started: AtomicU64,
    renders_failed: AtomicU64,
    deduplicated_requests: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Coordinator statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct RenderStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub renders_started: u64,
    pub renders_failed: u64,
    pub deduplicated_requests: u64,
    pub in_flight: DeduplicationStats,
    pub cache: Option<CacheStats>,
}

/// Cache-fronted, single-flight access to the rendering service.
///
/// A miss starts at most one background render per fingerprint and answers
/// `Pending` right away; callers come back with the fingerprint via
/// [`RenderClient::poll`].
#[derive(Clone)]
pub struct RenderClient {
    store: SharedCacheStore,
    dispatcher: SharedRenderDispatcher,
    deduplicator: SharedRequestDeduplicator,
    workers: Arc<Semaphore>,
    ttl: Duration,
    counters: Arc<Counters>,
}

impl RenderClient {
    /// Create a client with an in-memory cache and the HTTP renderer
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let store = Arc::new(MemoryCache::new(config.cache.clone()));
        Self::with_store(config, store)
    }

    /// Create a client on top of an existing cache store
    pub fn with_store(config: &ClientConfig, store: SharedCacheStore) -> Result<Self, Error> {
        let dispatcher = Arc::new(HttpDispatcher::new(&config.dispatcher)?);
        Ok(Self::with_parts(config, store, dispatcher))
    }

    pub fn with_parts(
        config: &ClientConfig,
        store: SharedCacheStore,
        dispatcher: SharedRenderDispatcher,
    ) -> Self {
        log::info!(
            "Initialized RenderClient (TTL: {}min, concurrent renders: {})",
            config.cache.ttl.num_minutes(),
            config.dispatcher.max_concurrent
        );

        Self {
            store,
            dispatcher,
            deduplicator: Arc::new(RequestDeduplicator::new()),
            workers: Arc::new(Semaphore::new(config.dispatcher.max_concurrent.max(1))),
            ttl: config.cache.ttl,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Serve `request` from the cache or make sure it is being rendered.
    pub async fn submit(&self, request: &RenderRequest) -> Result<Submission, Error> {
        let fingerprint = Fingerprint::of(request);

        if let Some(image) = self.cached(&fingerprint).await? {
            Counters::bump(&self.counters.cache_hits);
            log::info!("Returning cached image for key: {}", fingerprint);
            return Ok(Submission::ServedFromCache { fingerprint, image });
        }
        Counters::bump(&self.counters.cache_misses);

        let Some(registration) = self.deduplicator.try_register(&fingerprint) else {
            Counters::bump(&self.counters.deduplicated_requests);
            return Ok(Submission::Pending(fingerprint));
        };

        // A computation may have finished between the lookup and the registration.
        if let Some(image) = self.cached(&fingerprint).await? {
            registration.complete(ComputationOutcome::Stored);
            return Ok(Submission::ServedFromCache { fingerprint, image });
        }

        self.spawn_computation(registration, request.clone());
        Ok(Submission::Pending(fingerprint))
    }

    /// Check on a fingerprint handed out by [`RenderClient::submit`].
    pub async fn poll(&self, fingerprint: &Fingerprint) -> Result<PollResult, Error> {
        if let Some(image) = self.cached(fingerprint).await? {
            return Ok(PollResult::Cached(image));
        }
        if self.deduplicator.is_pending(fingerprint) {
            return Ok(PollResult::Pending);
        }

        // Results are stored before their registration is released, so a
        // second read catches a computation that just finished.
        Ok(match self.cached(fingerprint).await? {
            Some(image) => PollResult::Cached(image),
            None => PollResult::NotFound,
        })
    }

    pub async fn status(&self, fingerprint: &Fingerprint) -> Result<FingerprintState, Error> {
        if self.store.exists(fingerprint).await? {
            return Ok(FingerprintState::Cached);
        }
        if self.deduplicator.is_pending(fingerprint) {
            return Ok(FingerprintState::Computing);
        }
        if self.store.exists(fingerprint).await? {
            return Ok(FingerprintState::Cached);
        }
        Ok(FingerprintState::NoEntry)
    }

    /// Completion signal of the computation for `fingerprint`, if one is running.
    pub fn completion(&self, fingerprint: &Fingerprint) -> Option<Completion> {
        self.deduplicator.subscribe(fingerprint)
    }

    /// Submit and wait for the image.
    pub async fn render(&self, request: &RenderRequest) -> Result<RenderedImage, Error> {
        let fingerprint = match self.submit(request).await? {
            Submission::ServedFromCache { image, .. } => return Ok(image),
            Submission::Pending(fingerprint) => fingerprint,
        };

        if let Some(completion) = self.completion(&fingerprint) {
            match completion.wait().await {
                ComputationOutcome::Stored => {}
                ComputationOutcome::Failed(reason) => return Err(Error::UpstreamFailure(reason)),
                ComputationOutcome::Abandoned => {
                    return Err(Error::UpstreamFailure(
                        "render was abandoned before completing".to_string(),
                    ))
                }
            }
        }

        self.cached(&fingerprint).await?.ok_or_else(|| {
            Error::UpstreamFailure(format!("no image was produced for key {}", fingerprint))
        })
    }

    pub fn stats(&self) -> RenderStats {
        let counters = &self.counters;
        RenderStats {
            cache_hits: counters.cache_hits.load(Ordering::Relaxed),
            cache_misses: counters.cache_misses.load(Ordering::Relaxed),
            renders_started: counters.renders_started.load(Ordering::Relaxed),
            renders_failed: counters.renders_failed.load(Ordering::Relaxed),
            deduplicated_requests: counters.deduplicated_requests.load(Ordering::Relaxed),
            in_flight: self.deduplicator.stats(),
            cache: self.store.stats(),
        }
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.store.stats()
    }

    /// Clear the cache store
    pub async fn clear_cache(&self) -> Result<usize, Error> {
        Ok(self.store.clear().await?)
    }

    async fn cached(&self, fingerprint: &Fingerprint) -> Result<Option<RenderedImage>, Error> {
        match self.store.get(fingerprint).await {
            Ok(image) => Ok(Some(image)),
            Err(CacheError::NotFound) => Ok(None),
            Err(err) => {
                log::error!("Cache lookup failed for key {}: {}", fingerprint, err);
                Err(err.into())
            }
        }
    }

    /// Render in a detached task. The task owns the registration, so it is
    /// released even if the caller goes away or the render panics.
    fn spawn_computation(&self, registration: Registration, request: RenderRequest) {
        let store = Arc::clone(&self.store);
        let dispatcher = Arc::clone(&self.dispatcher);
        let workers = Arc::clone(&self.workers);
        let ttl = self.ttl;

        Counters::bump(&self.counters.renders_started);
        log::info!("Rendering alignment for key: {}", registration.key());
        let task = RenderTask::new(registration, Arc::clone(&self.counters));

        tokio::spawn(async move {
            let outcome = match workers.acquire_owned().await {
                Ok(_permit) => match dispatcher.render(&request).await {
                    Ok(image) => match store.put(task.key(), image, ttl).await {
                        Ok(()) => ComputationOutcome::Stored,
                        Err(err) => ComputationOutcome::Failed(err.to_string()),
                    },
                    Err(err) => ComputationOutcome::Failed(err.to_string()),
                },
                Err(_) => ComputationOutcome::Failed("render workers shut down".to_string()),
            };
            task.finish(outcome);
        });
    }
}

/// Registration held by a background render. Dropping it unfinished counts
/// as a failed render before the registration is released.
struct RenderTask {
    key: Fingerprint,
    registration: Option<Registration>,
    counters: Arc<Counters>,
}

impl RenderTask {
    fn new(registration: Registration, counters: Arc<Counters>) -> Self {
        Self {
            key: registration.key().clone(),
            registration: Some(registration),
            counters,
        }
    }

    fn key(&self) -> &Fingerprint {
        &self.key
    }

    fn finish(mut self, outcome: ComputationOutcome) {
        if let ComputationOutcome::Failed(reason) = &outcome {
            Counters::bump(&self.counters.renders_failed);
            log::warn!("Render failed for key {}: {}", self.key, reason);
        } else {
            log::debug!("Render stored for key: {}", self.key);
        }
        if let Some(registration) = self.registration.take() {
            registration.complete(outcome);
        }
    }
}

impl Drop for RenderTask {
    fn drop(&mut self) {
        if self.registration.is_some() {
            Counters::bump(&self.counters.renders_failed);
            log::warn!("Render abandoned for key: {}", self.key);
        }
    }
}
