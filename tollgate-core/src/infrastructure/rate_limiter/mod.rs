//! Admission Control Infrastructure
//!
//! Per-key token buckets with lazy refill:
//! - `token_bucket`: the refill/consume state machine of one bucket
//! - `storage`: the key to bucket map and its locking discipline
//! - `sharded`: hash-partitioned store for high key counts
//! - `service`: policy resolution, counters and the idle sweeper

pub mod service;
pub mod sharded;
pub mod storage;
mod token_bucket;

pub use service::AdmissionService;
pub use sharded::ShardedBucketStore;
pub use storage::{BucketStore, InMemoryBucketStore};
