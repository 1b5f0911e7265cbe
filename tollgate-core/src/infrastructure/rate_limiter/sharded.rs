//! Hash-partitioned bucket store
//!
//! Keys are spread over several [`InMemoryBucketStore`]s so first-access
//! inserts and sweeps on one shard never block lookups on another.

use std::hash::{BuildHasher, RandomState};
use std::time::Duration;

use tokio::time::Instant;

use super::storage::{BucketStore, InMemoryBucketStore};
use crate::domain::{AdmissionDecision, BucketConfig, BucketSnapshot};

pub struct ShardedBucketStore {
    shards: Box<[InMemoryBucketStore]>,
    hasher: RandomState,
}

impl ShardedBucketStore {
    /// Create a store with `shards` partitions (at least one)
    pub fn new(shards: usize) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| InMemoryBucketStore::new())
            .collect();
        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, key: &str) -> &InMemoryBucketStore {
        let index = self.hasher.hash_one(key) as usize % self.shards.len();
        &self.shards[index]
    }
}

impl BucketStore for ShardedBucketStore {
    fn try_consume(
        &self,
        key: &str,
        cost: f64,
        config: &BucketConfig,
        now: Instant,
    ) -> AdmissionDecision {
        self.shard(key).try_consume(key, cost, config, now)
    }

    fn peek(&self, key: &str, config: &BucketConfig, now: Instant) -> BucketSnapshot {
        self.shard(key).peek(key, config, now)
    }

    fn reset(&self, key: &str, config: &BucketConfig, now: Instant) {
        self.shard(key).reset(key, config, now)
    }

    fn sweep_idle(&self, idle_for: Duration, now: Instant) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.sweep_idle(idle_for, now))
            .sum()
    }

    fn clear(&self) {
        for shard in self.shards.iter() {
            shard.clear();
        }
    }

    fn len(&self) -> usize {
        self.shards.iter().map(BucketStore::len).sum()
    }
}
