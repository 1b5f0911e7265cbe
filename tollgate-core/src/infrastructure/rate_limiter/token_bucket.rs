//! Token Bucket
//!
//! Tokens are added at a constant rate up to the capacity and each request
//! consumes tokens equal to its cost. Refill is lazy: nothing ticks in the
//! background, the elapsed time is credited whenever the bucket is touched.
//!
//! Tokens are tracked as `f64` so repeated partial refills do not drift.

use std::time::Duration;

use tokio::time::Instant;

use crate::domain::{AdmissionDecision, BucketConfig, BucketSnapshot};

/// Mutable state of one key's bucket
///
/// Always accessed through the store's per-bucket mutex.
#[derive(Debug)]
pub(crate) struct TokenBucket {
    config: BucketConfig,
    tokens: f64,
    last_refill: Instant,
    last_access: Instant,
    /// Set by the idle sweep when the bucket is removed from the map
    evicted: bool,
}

impl TokenBucket {
    /// A full bucket
    pub(crate) fn new(config: BucketConfig, now: Instant) -> Self {
        Self {
            config,
            tokens: config.max_tokens(),
            last_refill: now,
            last_access: now,
            evicted: false,
        }
    }

    /// Tokens the bucket would hold at `now`, without mutating anything
    fn projected_tokens(&self, now: Instant) -> f64 {
        // A `now` older than the last refill means another caller won the
        // lock with a later timestamp; credit nothing.
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        (self.tokens + elapsed * self.config.refill_rate_per_second()).min(self.config.max_tokens())
    }

    fn refill(&mut self, now: Instant) {
        self.tokens = self.projected_tokens(now);
        if now > self.last_refill {
            self.last_refill = now;
        }
    }

    /// Switch to `config` if it differs from the current limits
    ///
    /// Time elapsed so far is credited at the old rate before the new
    /// capacity clamps the token count.
    pub(crate) fn adopt(&mut self, config: &BucketConfig, now: Instant) {
        if self.config == *config {
            return;
        }
        self.refill(now);
        self.config = *config;
        self.tokens = self.tokens.min(config.max_tokens());
    }

    /// Refill, then take `cost` tokens if there are enough
    pub(crate) fn try_consume(&mut self, cost: f64, now: Instant) -> AdmissionDecision {
        self.refill(now);
        self.touch(now);

        if self.tokens >= cost {
            self.tokens = (self.tokens - cost).max(0.0);
            AdmissionDecision::allowed(self.tokens, &self.config)
        } else {
            AdmissionDecision::rejected(self.tokens, cost, &self.config)
        }
    }

    /// Refilled view under `config`; leaves tokens and refill time untouched
    pub(crate) fn snapshot(&mut self, config: &BucketConfig, now: Instant) -> BucketSnapshot {
        self.touch(now);
        let remaining_tokens = self.projected_tokens(now).min(config.max_tokens());
        BucketSnapshot {
            capacity: config.capacity(),
            remaining_tokens,
            refill_rate_per_second: config.refill_rate_per_second(),
        }
    }

    /// Back to full capacity
    pub(crate) fn fill(&mut self, now: Instant) {
        self.tokens = self.config.max_tokens();
        if now > self.last_refill {
            self.last_refill = now;
        }
        self.touch(now);
    }

    fn touch(&mut self, now: Instant) {
        if now > self.last_access {
            self.last_access = now;
        }
    }

    pub(crate) fn is_idle(&self, idle_for: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_access) >= idle_for
    }

    /// Idle and already refilled to capacity
    ///
    /// A swept key comes back as a full bucket, so a bucket that is still
    /// refilling must stay or the sweep would hand out unearned tokens.
    pub(crate) fn is_evictable(&self, idle_for: Duration, now: Instant) -> bool {
        self.is_idle(idle_for, now) && self.projected_tokens(now) >= self.config.max_tokens()
    }

    pub(crate) fn is_evicted(&self) -> bool {
        self.evicted
    }

    pub(crate) fn mark_evicted(&mut self) {
        self.evicted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(capacity: u32, rate: f64) -> BucketConfig {
        BucketConfig::new(capacity, rate).unwrap()
    }

    #[test]
    fn test_new_bucket_is_full() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new(config(5, 1.0), now);
        let snapshot = bucket.snapshot(&config(5, 1.0), now);
        assert_eq!(snapshot.remaining_tokens, 5.0);
        assert_eq!(snapshot.capacity, 5);
    }

    #[test]
    fn test_burst_then_reject() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new(config(5, 1.0), now);

        for i in 0..5 {
            let decision = bucket.try_consume(1.0, now);
            assert!(decision.allowed, "request {} should be admitted", i + 1);
            assert_eq!(decision.remaining_tokens, 4.0 - f64::from(i));
        }

        let decision = bucket.try_consume(1.0, now);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining_tokens, 0.0);
        assert!((decision.retry_after_seconds - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fractional_refill_accumulates() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(config(5, 1.0), start);
        for _ in 0..5 {
            bucket.try_consume(1.0, start);
        }

        // Four quarter-second steps add exactly one token
        let mut now = start;
        for _ in 0..3 {
            now += Duration::from_millis(250);
            assert!(!bucket.try_consume(1.0, now).allowed);
        }
        now += Duration::from_millis(250);
        assert!(bucket.try_consume(1.0, now).allowed);
    }

    #[test]
    fn test_refill_saturates_at_capacity() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(config(5, 1.0), start);
        bucket.try_consume(3.0, start);

        let later = start + Duration::from_secs(3600);
        let snapshot = bucket.snapshot(&config(5, 1.0), later);
        assert_eq!(snapshot.remaining_tokens, 5.0);
    }

    #[test]
    fn test_snapshot_does_not_move_refill_clock() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(config(5, 1.0), start);
        bucket.try_consume(5.0, start);

        let t1 = start + Duration::from_secs(1);
        let first = bucket.snapshot(&config(5, 1.0), t1);
        let second = bucket.snapshot(&config(5, 1.0), t1);
        assert_eq!(first, second);
        assert!((first.remaining_tokens - 1.0).abs() < 1e-9);

        // The consume at t2 still sees the full two seconds of refill
        let t2 = start + Duration::from_secs(2);
        let decision = bucket.try_consume(1.0, t2);
        assert!(decision.allowed);
        assert!((decision.remaining_tokens - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stale_now_credits_nothing() {
        let start = Instant::now();
        let later = start + Duration::from_secs(2);
        let mut bucket = TokenBucket::new(config(5, 1.0), start);
        bucket.try_consume(5.0, later);

        // A caller that captured its timestamp before `later` gets no refill
        // and cannot pull the refill clock backwards.
        let decision = bucket.try_consume(1.0, start + Duration::from_secs(1));
        assert!(!decision.allowed);
        assert_eq!(bucket.last_refill, later);
    }

    #[test]
    fn test_adopt_clamps_to_smaller_capacity() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(config(10, 1.0), start);
        bucket.adopt(&config(3, 1.0), start);

        let decision = bucket.try_consume(1.0, start);
        assert_eq!(decision.capacity, 3);
        assert_eq!(decision.remaining_tokens, 2.0);
    }

    #[test]
    fn test_adopt_credits_elapsed_time_at_old_rate() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(config(10, 1.0), start);
        bucket.try_consume(10.0, start);

        let later = start + Duration::from_secs(2);
        bucket.adopt(&config(10, 100.0), later);
        let decision = bucket.try_consume(1.0, later);
        assert!((decision.remaining_tokens - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fill_restores_capacity() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(config(4, 0.1), start);
        bucket.try_consume(4.0, start);
        bucket.fill(start);
        assert_eq!(bucket.snapshot(&config(4, 0.1), start).remaining_tokens, 4.0);
    }

    #[test]
    fn test_idle_tracking() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(config(4, 1.0), start);
        let idle_for = Duration::from_secs(60);

        assert!(!bucket.is_idle(idle_for, start + Duration::from_secs(59)));
        assert!(bucket.is_idle(idle_for, start + Duration::from_secs(60)));

        bucket.try_consume(1.0, start + Duration::from_secs(30));
        assert!(!bucket.is_idle(idle_for, start + Duration::from_secs(60)));
    }

    #[test]
    fn test_refilling_bucket_is_not_evictable() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(config(100, 0.1), start);
        let idle_for = Duration::from_secs(60);
        bucket.try_consume(100.0, start);

        // Idle for two minutes but only 12 of 100 tokens back
        let later = start + Duration::from_secs(120);
        assert!(bucket.is_idle(idle_for, later));
        assert!(!bucket.is_evictable(idle_for, later));

        // Full again after 1000 seconds
        assert!(bucket.is_evictable(idle_for, start + Duration::from_secs(1000)));
    }
}
