//! Infrastructure Layer - bucket storage and the admission service

pub mod rate_limiter;

pub use rate_limiter::{AdmissionService, BucketStore, InMemoryBucketStore, ShardedBucketStore};
