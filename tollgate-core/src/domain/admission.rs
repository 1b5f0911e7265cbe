//! Admission value objects
//!
//! Everything here is a plain value handed to callers. The mutable bucket
//! state itself never leaves the store.

use serde::Serialize;

use crate::config::validation::validate_limits;
use crate::config::{LimitConfig, ValidationError};

/// Validated limits of one bucket
///
/// Can only be built through [`BucketConfig::new`] or `TryFrom<LimitConfig>`,
/// so capacity and refill rate are always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketConfig {
    capacity: u32,
    refill_rate_per_second: f64,
}

impl BucketConfig {
    pub fn new(capacity: u32, refill_rate_per_second: f64) -> Result<Self, ValidationError> {
        Self::try_from(LimitConfig {
            capacity,
            refill_rate_per_second,
        })
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Capacity as a token amount
    pub fn max_tokens(&self) -> f64 {
        f64::from(self.capacity)
    }

    pub fn refill_rate_per_second(&self) -> f64 {
        self.refill_rate_per_second
    }

    /// Seconds until `tokens` grows to `target` at this bucket's rate
    pub fn seconds_until(&self, tokens: f64, target: f64) -> f64 {
        ((target - tokens) / self.refill_rate_per_second).max(0.0)
    }
}

impl TryFrom<LimitConfig> for BucketConfig {
    type Error = ValidationError;

    fn try_from(limits: LimitConfig) -> Result<Self, Self::Error> {
        validate_limits(&limits, "bucket")?;
        Ok(Self {
            capacity: limits.capacity,
            refill_rate_per_second: limits.refill_rate_per_second,
        })
    }
}

/// Outcome of a single admission check
///
/// A rejection is a normal value, not an error: `allowed` is false and
/// `retry_after_seconds` estimates when enough tokens will have refilled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdmissionDecision {
    pub allowed: bool,
    /// Tokens left after this call (fractional)
    pub remaining_tokens: f64,
    /// Zero when allowed, `(cost - remaining) / rate` when rejected
    pub retry_after_seconds: f64,
    pub capacity: u32,
    pub refill_rate_per_second: f64,
}

impl AdmissionDecision {
    pub fn allowed(remaining_tokens: f64, config: &BucketConfig) -> Self {
        Self {
            allowed: true,
            remaining_tokens,
            retry_after_seconds: 0.0,
            capacity: config.capacity(),
            refill_rate_per_second: config.refill_rate_per_second(),
        }
    }

    pub fn rejected(remaining_tokens: f64, cost: f64, config: &BucketConfig) -> Self {
        Self {
            allowed: false,
            remaining_tokens,
            retry_after_seconds: config.seconds_until(remaining_tokens, cost),
            capacity: config.capacity(),
            refill_rate_per_second: config.refill_rate_per_second(),
        }
    }

    /// Whole tokens left, the number callers display
    pub fn remaining_whole(&self) -> u64 {
        self.remaining_tokens.floor() as u64
    }

    /// Retry hint rounded up to whole seconds, at least 1 for a rejection
    pub fn retry_after_whole_seconds(&self) -> u64 {
        if self.allowed {
            0
        } else {
            (self.retry_after_seconds.ceil() as u64).max(1)
        }
    }

    /// Seconds until the bucket is full again if nothing else consumes from it
    pub fn reset_after_seconds(&self) -> f64 {
        ((f64::from(self.capacity) - self.remaining_tokens) / self.refill_rate_per_second).max(0.0)
    }
}

/// Refilled view of a bucket, without consuming anything
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketSnapshot {
    pub capacity: u32,
    pub remaining_tokens: f64,
    pub refill_rate_per_second: f64,
}

/// Status of a key as reported to pollers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketStatus {
    /// Name of the policy that resolved this key's limits
    pub policy: String,
    pub capacity: u32,
    pub remaining_tokens: f64,
    pub refill_rate_per_second: f64,
}

impl BucketStatus {
    pub fn new(policy: &str, snapshot: BucketSnapshot) -> Self {
        Self {
            policy: policy.to_owned(),
            capacity: snapshot.capacity,
            remaining_tokens: snapshot.remaining_tokens,
            refill_rate_per_second: snapshot.refill_rate_per_second,
        }
    }

    pub fn remaining_whole(&self) -> u64 {
        self.remaining_tokens.floor() as u64
    }
}

/// Running totals of admission decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdmissionStats {
    pub allowed: u64,
    pub rejected: u64,
    /// Buckets currently held by the store
    pub buckets: usize,
}

/// Result of running an operation behind an admission check
#[derive(Debug)]
pub enum Guarded<T> {
    Admitted { value: T, decision: AdmissionDecision },
    Rejected(AdmissionDecision),
}

impl<T> Guarded<T> {
    pub fn decision(&self) -> &AdmissionDecision {
        match self {
            Guarded::Admitted { decision, .. } | Guarded::Rejected(decision) => decision,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Guarded::Admitted { value, .. } => Some(value),
            Guarded::Rejected(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_config_rejects_non_positive_limits() {
        assert!(BucketConfig::new(0, 1.0).is_err());
        assert!(BucketConfig::new(5, 0.0).is_err());
        assert!(BucketConfig::new(5, -0.5).is_err());
        assert!(BucketConfig::new(5, f64::NAN).is_err());

        let config = BucketConfig::new(5, 0.5).unwrap();
        assert_eq!(config.capacity(), 5);
        assert_eq!(config.max_tokens(), 5.0);
        assert_eq!(config.refill_rate_per_second(), 0.5);
    }

    #[test]
    fn test_rejected_decision_retry_after() {
        let config = BucketConfig::new(5, 2.0).unwrap();
        let decision = AdmissionDecision::rejected(0.5, 3.0, &config);

        assert!(!decision.allowed);
        assert!((decision.retry_after_seconds - 1.25).abs() < 1e-9);
        assert_eq!(decision.retry_after_whole_seconds(), 2);
        assert_eq!(decision.remaining_whole(), 0);
    }

    #[test]
    fn test_retry_after_whole_seconds_is_at_least_one() {
        let config = BucketConfig::new(5, 100.0).unwrap();
        let decision = AdmissionDecision::rejected(0.9, 1.0, &config);
        assert!(decision.retry_after_seconds < 0.01);
        assert_eq!(decision.retry_after_whole_seconds(), 1);

        let allowed = AdmissionDecision::allowed(4.0, &config);
        assert_eq!(allowed.retry_after_whole_seconds(), 0);
    }

    #[test]
    fn test_reset_after_seconds() {
        let config = BucketConfig::new(5, 0.5).unwrap();
        let decision = AdmissionDecision::allowed(3.0, &config);
        assert!((decision.reset_after_seconds() - 4.0).abs() < 1e-9);

        let full = AdmissionDecision::allowed(5.0, &config);
        assert_eq!(full.reset_after_seconds(), 0.0);
    }

    #[test]
    fn test_bucket_status_serializes_policy_name() {
        let status = BucketStatus::new(
            "premium",
            BucketSnapshot {
                capacity: 50,
                remaining_tokens: 12.5,
                refill_rate_per_second: 10.0,
            },
        );
        assert_eq!(status.remaining_whole(), 12);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["policy"], "premium");
        assert_eq!(json["capacity"], 50);
        assert_eq!(json["remaining_tokens"], 12.5);
    }

    #[test]
    fn test_guarded_accessors() {
        let config = BucketConfig::new(1, 1.0).unwrap();
        let admitted = Guarded::Admitted {
            value: 7,
            decision: AdmissionDecision::allowed(0.0, &config),
        };
        assert!(admitted.decision().allowed);
        assert_eq!(admitted.into_value(), Some(7));

        let rejected: Guarded<i32> = Guarded::Rejected(AdmissionDecision::rejected(0.0, 1.0, &config));
        assert!(!rejected.decision().allowed);
        assert_eq!(rejected.into_value(), None);
    }
}
