//! API request and response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use tollgate_core::domain::{AdmissionDecision, AdmissionStats, BucketStatus};

/// Request model for an admission check
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckRequest {
    /// Caller-chosen identity the limit applies to (user, client, IP, ...)
    #[schema(example = "user_42")]
    pub key: String,

    /// Tokens this request consumes; defaults to 1
    #[schema(example = 1.0)]
    pub cost: Option<f64>,
}

/// Outcome of an admission check
#[derive(Debug, Serialize, ToSchema)]
pub struct DecisionResponse {
    #[schema(example = "user_42")]
    pub key: String,

    pub allowed: bool,

    /// Bucket capacity
    #[schema(example = 5)]
    pub limit: u32,

    /// Whole tokens left after this request
    #[schema(example = 4)]
    pub remaining: u64,

    /// Exact (fractional) tokens left after this request
    #[schema(example = 4.0)]
    pub remaining_tokens: f64,

    #[schema(example = 0.5)]
    pub refill_rate_per_second: f64,

    /// Whole seconds to wait before retrying; 0 when allowed
    #[schema(example = 0)]
    pub retry_after_seconds: u64,

    /// Seconds until the bucket is full again without further use
    #[schema(example = 2.0)]
    pub reset_after_seconds: f64,
}

impl DecisionResponse {
    pub fn new(key: &str, decision: &AdmissionDecision) -> Self {
        Self {
            key: key.to_string(),
            allowed: decision.allowed,
            limit: decision.capacity,
            remaining: decision.remaining_whole(),
            remaining_tokens: decision.remaining_tokens,
            refill_rate_per_second: decision.refill_rate_per_second,
            retry_after_seconds: decision.retry_after_whole_seconds(),
            reset_after_seconds: decision.reset_after_seconds(),
        }
    }
}

/// Current state of a key's bucket
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    #[schema(example = "premium:alice")]
    pub key: String,

    /// Policy that resolved this key's limits
    #[schema(example = "premium")]
    pub policy: String,

    #[schema(example = 50)]
    pub limit: u32,

    #[schema(example = 37)]
    pub remaining: u64,

    #[schema(example = 37.5)]
    pub remaining_tokens: f64,

    #[schema(example = 10.0)]
    pub refill_rate_per_second: f64,
}

impl StatusResponse {
    pub fn new(key: &str, status: &BucketStatus) -> Self {
        Self {
            key: key.to_string(),
            policy: status.policy.clone(),
            limit: status.capacity,
            remaining: status.remaining_whole(),
            remaining_tokens: status.remaining_tokens,
            refill_rate_per_second: status.refill_rate_per_second,
        }
    }
}

/// Admission totals since startup
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    #[schema(example = 1024)]
    pub allowed: u64,

    #[schema(example = 17)]
    pub rejected: u64,

    /// Buckets currently held in memory
    #[schema(example = 230)]
    pub buckets: usize,
}

impl From<AdmissionStats> for StatsResponse {
    fn from(stats: AdmissionStats) -> Self {
        Self {
            allowed: stats.allowed,
            rejected: stats.rejected,
            buckets: stats.buckets,
        }
    }
}

/// Error response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code
    #[schema(example = "RATE_LIMIT_EXCEEDED")]
    pub code: String,

    /// Human-readable error message
    #[schema(example = "Rate limit exceeded. Please retry after 2 seconds.")]
    pub message: String,

    /// Additional error context
    #[schema(example = r#"{"retry_after": 2, "limit": 5, "remaining": 0}"#)]
    pub details: Option<serde_json::Value>,

    /// Unique request identifier for tracking and support
    pub request_id: Uuid,

    /// Error occurrence timestamp
    #[schema(example = "2024-01-15T10:30:00Z")]
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall service health status
    #[schema(example = "healthy")]
    pub status: String,

    /// Current service version
    #[schema(example = "0.3.0")]
    pub version: String,

    /// Health check timestamp
    #[schema(example = "2024-01-15T10:30:00Z")]
    pub timestamp: DateTime<Utc>,
}
