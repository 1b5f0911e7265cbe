//! Bucket Storage
//!
//! Owns the key to bucket mapping. Two layers of locking:
//! - a map lock, held only to fetch or insert the bucket handle
//! - a per-bucket mutex, held for the refill/consume arithmetic
//!
//! The map lock is always released before a bucket lock is taken, so work on
//! one key never waits for another key's refill.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, trace};

use super::token_bucket::TokenBucket;
use crate::domain::{AdmissionDecision, BucketConfig, BucketSnapshot};

/// Trait for bucket store implementations
///
/// `config` is the limit set currently resolved for `key`. It is used to
/// create the bucket on first access and adopted by existing buckets whose
/// limits differ.
pub trait BucketStore: Send + Sync {
    /// Refill, then consume `cost` tokens if available
    fn try_consume(
        &self,
        key: &str,
        cost: f64,
        config: &BucketConfig,
        now: Instant,
    ) -> AdmissionDecision;

    /// Refilled view of the bucket; never consumes or moves the refill clock
    fn peek(&self, key: &str, config: &BucketConfig, now: Instant) -> BucketSnapshot;

    /// Refill the bucket to capacity
    fn reset(&self, key: &str, config: &BucketConfig, now: Instant);

    /// Remove full buckets untouched for at least `idle_for`, returning how many went
    fn sweep_idle(&self, idle_for: Duration, now: Instant) -> usize;

    /// Drop every bucket
    fn clear(&self);

    /// Number of live buckets
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type BucketHandle = Arc<Mutex<TokenBucket>>;

/// A single guarded map of buckets
#[derive(Default)]
pub struct InMemoryBucketStore {
    buckets: RwLock<HashMap<String, BucketHandle>>,
}

impl InMemoryBucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the bucket for `key`, inserting a full one on first access
    ///
    /// The insert happens under the write lock through `entry`, so concurrent
    /// first callers all receive the same bucket.
    fn get_or_create(&self, key: &str, config: &BucketConfig, now: Instant) -> BucketHandle {
        let existing = self.buckets.read().get(key).cloned();
        if let Some(bucket) = existing {
            return bucket;
        }

        let mut buckets = self.buckets.write();
        let bucket = buckets.entry(key.to_owned()).or_insert_with(|| {
            debug!(
                key = %key,
                capacity = config.capacity(),
                refill_rate = config.refill_rate_per_second(),
                "Created token bucket"
            );
            Arc::new(Mutex::new(TokenBucket::new(*config, now)))
        });
        Arc::clone(bucket)
    }

    /// Run `op` on the live bucket for `key`
    ///
    /// A handle fetched just before the idle sweep removed it is marked
    /// evicted; in that case the lookup is repeated so nothing is ever
    /// applied to an orphaned bucket.
    fn with_bucket<R>(
        &self,
        key: &str,
        config: &BucketConfig,
        now: Instant,
        mut op: impl FnMut(&mut TokenBucket) -> R,
    ) -> R {
        loop {
            let handle = self.get_or_create(key, config, now);
            let mut bucket = handle.lock();
            if bucket.is_evicted() {
                trace!(key = %key, "Bucket evicted during lookup, retrying");
                continue;
            }
            return op(&mut bucket);
        }
    }
}

impl BucketStore for InMemoryBucketStore {
    fn try_consume(
        &self,
        key: &str,
        cost: f64,
        config: &BucketConfig,
        now: Instant,
    ) -> AdmissionDecision {
        self.with_bucket(key, config, now, |bucket| {
            bucket.adopt(config, now);
            bucket.try_consume(cost, now)
        })
    }

    fn peek(&self, key: &str, config: &BucketConfig, now: Instant) -> BucketSnapshot {
        self.with_bucket(key, config, now, |bucket| bucket.snapshot(config, now))
    }

    fn reset(&self, key: &str, config: &BucketConfig, now: Instant) {
        self.with_bucket(key, config, now, |bucket| {
            bucket.adopt(config, now);
            bucket.fill(now);
        });
    }

    fn sweep_idle(&self, idle_for: Duration, now: Instant) -> usize {
        let mut buckets = self.buckets.write();
        let before = buckets.len();

        // A bucket whose lock is held has an operation in flight; keep it.
        buckets.retain(|_, handle| match handle.try_lock() {
            Some(mut bucket) if bucket.is_evictable(idle_for, now) => {
                bucket.mark_evicted();
                false
            }
            _ => true,
        });

        before - buckets.len()
    }

    fn clear(&self) {
        let mut buckets = self.buckets.write();
        for (_, handle) in buckets.drain() {
            handle.lock().mark_evicted();
        }
    }

    fn len(&self) -> usize {
        self.buckets.read().len()
    }
}
