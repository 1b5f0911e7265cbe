//! Admission Service
//!
//! The entry point request handlers and pollers use. Resolves the limits for
//! a key, delegates to the bucket store and keeps running totals.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::sharded::ShardedBucketStore;
use super::storage::{BucketStore, InMemoryBucketStore};
use crate::config::{AdmissionConfig, ReconfigurePolicy, ValidationError};
use crate::domain::{
    AdmissionDecision, AdmissionError, AdmissionStats, BucketStatus, Guarded, PolicyTable,
    ResolvedPolicy,
};

/// Validated, immutable view of an [`AdmissionConfig`]
///
/// Replaced wholesale by `configure`. Store operations hold the read lock
/// for their whole duration, so no bucket is ever created from limits that
/// a concurrent `configure` has already replaced.
struct Settings {
    table: PolicyTable,
    reconfigure: ReconfigurePolicy,
    idle_eviction: Option<Duration>,
    sweep_interval: Duration,
}

impl Settings {
    fn from_config(config: &AdmissionConfig) -> Result<Self, ValidationError> {
        Ok(Self {
            table: PolicyTable::from_config(config)?,
            reconfigure: config.reconfigure_policy,
            idle_eviction: config.idle_eviction(),
            sweep_interval: config.sweep_interval(),
        })
    }
}

/// Per-key token bucket admission control
pub struct AdmissionService {
    store: Arc<dyn BucketStore>,
    settings: RwLock<Settings>,
    allowed: AtomicU64,
    rejected: AtomicU64,
}

impl AdmissionService {
    /// Create a service backed by an in-memory store laid out per `config.store`
    pub fn new(config: AdmissionConfig) -> Result<Self, ValidationError> {
        let store: Arc<dyn BucketStore> = match config.store.shards {
            1 => Arc::new(InMemoryBucketStore::new()),
            shards => Arc::new(ShardedBucketStore::new(shards)),
        };
        Self::with_store(store, config)
    }

    /// Create with a custom store
    pub fn with_store(
        store: Arc<dyn BucketStore>,
        config: AdmissionConfig,
    ) -> Result<Self, ValidationError> {
        let settings = Settings::from_config(&config)?;
        info!(
            capacity = config.default.capacity,
            refill_rate = config.default.refill_rate_per_second,
            overrides = config.overrides.len(),
            shards = config.store.shards,
            "Admission service initialized"
        );

        Ok(Self {
            store,
            settings: RwLock::new(settings),
            allowed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        })
    }

    /// Limits currently applied to `key`
    pub fn policy_for(&self, key: &str) -> ResolvedPolicy {
        self.settings.read().table.resolve(key).clone()
    }

    /// Try to admit a request of `cost` tokens for `key`
    ///
    /// Running out of tokens is not an error: the returned decision carries
    /// `allowed = false` and a retry hint. The only error is a cost that is
    /// not a positive finite number.
    pub fn check(&self, key: &str, cost: f64) -> Result<AdmissionDecision, AdmissionError> {
        if !cost.is_finite() || cost <= 0.0 {
            return Err(AdmissionError::InvalidCost { cost });
        }

        let settings = self.settings.read();
        let policy = settings.table.resolve(key);
        let decision = self
            .store
            .try_consume(key, cost, &policy.config, Instant::now());

        if decision.allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
            debug!(
                key = %key,
                policy = %policy.name,
                cost,
                remaining = decision.remaining_tokens,
                "Request admitted"
            );
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            debug!(
                key = %key,
                policy = %policy.name,
                cost,
                remaining = decision.remaining_tokens,
                retry_after = decision.retry_after_seconds,
                "Request rejected"
            );
        }

        Ok(decision)
    }

    /// `check` with a cost of one token
    pub fn check_one(&self, key: &str) -> Result<AdmissionDecision, AdmissionError> {
        self.check(key, 1.0)
    }

    /// Current tokens for `key` without consuming any
    pub fn status(&self, key: &str) -> BucketStatus {
        let settings = self.settings.read();
        let policy = settings.table.resolve(key);
        let snapshot = self.store.peek(key, &policy.config, Instant::now());
        BucketStatus::new(&policy.name, snapshot)
    }

    /// Refill `key`'s bucket to capacity
    pub fn reset(&self, key: &str) {
        let settings = self.settings.read();
        let policy = settings.table.resolve(key);
        self.store.reset(key, &policy.config, Instant::now());
        info!(key = %key, policy = %policy.name, "Bucket reset");
    }

    /// Replace default limits, overrides and eviction settings
    ///
    /// The whole config is validated before anything changes. Existing
    /// buckets follow the configured [`ReconfigurePolicy`].
    pub fn configure(&self, config: AdmissionConfig) -> Result<(), ValidationError> {
        let next = Settings::from_config(&config)?;
        let reconfigure = next.reconfigure;

        let mut settings = self.settings.write();
        *settings = next;
        // In-flight operations finished before the write lock was granted
        if reconfigure == ReconfigurePolicy::Reset {
            self.store.clear();
        }
        drop(settings);

        info!(
            capacity = config.default.capacity,
            refill_rate = config.default.refill_rate_per_second,
            overrides = config.overrides.len(),
            policy = ?reconfigure,
            "Admission limits reconfigured"
        );
        Ok(())
    }

    /// Run `operation` only if `key` is admitted for `cost`
    pub async fn execute<F, Fut, T>(
        &self,
        key: &str,
        cost: f64,
        operation: F,
    ) -> Result<Guarded<T>, AdmissionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let decision = self.check(key, cost)?;
        if !decision.allowed {
            return Ok(Guarded::Rejected(decision));
        }

        let value = operation().await;
        Ok(Guarded::Admitted { value, decision })
    }

    /// Drop buckets idle longer than the configured threshold
    pub fn sweep_idle(&self) -> usize {
        let Some(idle_for) = self.settings.read().idle_eviction else {
            return 0;
        };

        let removed = self.store.sweep_idle(idle_for, Instant::now());
        if removed > 0 {
            debug!(removed, remaining = self.store.len(), "Idle buckets swept");
        }
        removed
    }

    /// Spawn the periodic idle sweep
    ///
    /// Returns `None` when eviction is disabled. The interval is fixed at
    /// spawn time; the idle threshold is re-read on every tick.
    pub fn start_sweeper(self: Arc<Self>, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        let period = {
            let settings = self.settings.read();
            if settings.idle_eviction.is_none() {
                return None;
            }
            settings.sweep_interval
        };

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Idle sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.sweep_idle();
                    }
                }
            }
        });

        info!(interval_seconds = period.as_secs(), "Idle sweeper started");
        Some(handle)
    }

    pub fn stats(&self) -> AdmissionStats {
        AdmissionStats {
            allowed: self.allowed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            buckets: self.store.len(),
        }
    }
}
