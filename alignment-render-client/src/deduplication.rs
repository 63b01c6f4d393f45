use crate::Fingerprint;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

/// How a computation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputationOutcome {
    /// The image was written to the cache.
    Stored,
    /// Rendering or storing failed; nothing was cached.
    Failed(String),
    /// The computation went away without reporting, e.g. its task panicked.
    Abandoned,
}

/// Represents a computation in progress
struct PendingComputation {
    started_at: DateTime<Utc>,
    outcome: watch::Sender<Option<ComputationOutcome>>,
}

/// In-flight registry for render computations.
///
/// At most one registration exists per fingerprint. Whoever wins
/// [`RequestDeduplicator::try_register`] owns the computation; everyone else
/// may subscribe to its outcome.
#[derive(Default)]
pub struct RequestDeduplicator {
    pending: Arc<DashMap<Fingerprint, PendingComputation>>,
}

impl RequestDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim the computation for `key`.
    ///
    /// Returns `None` if another caller already holds it.
    pub fn try_register(&self, key: &Fingerprint) -> Option<Registration> {
        match self.pending.entry(key.clone()) {
            Entry::Occupied(_) => {
                log::debug!("Computation already pending for key: {}", key);
                None
            }
            Entry::Vacant(slot) => {
                let (outcome, _) = watch::channel(None);
                slot.insert(PendingComputation {
                    started_at: Utc::now(),
                    outcome,
                });
                log::debug!("Registered computation for key: {}", key);
                Some(Registration {
                    key: key.clone(),
                    pending: Arc::clone(&self.pending),
                    outcome: None,
                })
            }
        }
    }

    pub fn is_pending(&self, key: &Fingerprint) -> bool {
        self.pending.contains_key(key)
    }

    /// Watch the computation for `key`, if one is running.
    pub fn subscribe(&self, key: &Fingerprint) -> Option<Completion> {
        self.pending.get(key).map(|pending| Completion {
            receiver: pending.outcome.subscribe(),
        })
    }

    /// Get statistics about pending computations
    pub fn stats(&self) -> DeduplicationStats {
        let now = Utc::now();
        let mut stats = DeduplicationStats::default();
        for entry in self.pending.iter() {
            stats.pending_requests += 1;
            stats.total_waiters += entry.value().outcome.receiver_count();
            let age = (now - entry.value().started_at).num_milliseconds().max(0) as u64;
            stats.oldest_pending_ms = stats.oldest_pending_ms.max(age);
        }
        stats
    }
}

/// Ownership of one in-flight computation.
///
/// Dropping the registration releases it, whatever the reason: normal
/// completion, an early return, or a panic unwinding the owning task.
/// Watchers then see the reported outcome, or `Abandoned` if none was set.
pub struct Registration {
    key: Fingerprint,
    pending: Arc<DashMap<Fingerprint, PendingComputation>>,
    outcome: Option<ComputationOutcome>,
}

impl Registration {
    pub fn key(&self) -> &Fingerprint {
        &self.key
    }

    /// Publish `outcome` and release the registration.
    pub fn complete(mut self, outcome: ComputationOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or(ComputationOutcome::Abandoned);
        if let Some((_, pending)) = self.pending.remove(&self.key) {
            log::debug!(
                "Released computation for key: {} ({:?}, {} waiters)",
                self.key,
                outcome,
                pending.outcome.receiver_count()
            );
            pending.outcome.send_replace(Some(outcome));
        }
    }
}

/// Completion signal of an in-flight computation.
pub struct Completion {
    receiver: watch::Receiver<Option<ComputationOutcome>>,
}

impl Completion {
    /// Wait until the computation reports an outcome.
    pub async fn wait(mut self) -> ComputationOutcome {
        let outcome = match self.receiver.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or(ComputationOutcome::Abandoned)
    }
}

/// Statistics for in-flight computations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct DeduplicationStats {
    pub pending_requests: usize,
    pub total_waiters: usize,
    pub oldest_pending_ms: u64,
}

/// Thread-safe wrapper for the deduplicator
pub type SharedRequestDeduplicator = Arc<RequestDeduplicator>;
