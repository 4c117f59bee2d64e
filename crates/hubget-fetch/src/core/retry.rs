use std::time::Duration;

use rand::Rng;

/// Calculate the delay before a retry attempt using exponential backoff.
///
/// The delay formula is: `base * 2^retry_count`
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use hubget_fetch::retry_delay;
///
/// // First retry: base * 2^0 = base
/// assert_eq!(retry_delay(0, Duration::from_millis(100)), Duration::from_millis(100));
///
/// // Third retry: base * 2^2 = base * 4
/// assert_eq!(retry_delay(2, Duration::from_millis(100)), Duration::from_millis(400));
/// ```
pub fn retry_delay(retry_count: u32, base: Duration) -> Duration {
    let multiplier = 2_u32.saturating_pow(retry_count);
    base.saturating_mul(multiplier)
}

/// Bounded retries with capped exponential backoff and jitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per operation, including the first.
    ///
    /// Default: 3
    pub max_attempts: u32,

    /// Default: 500ms
    pub base_delay: Duration,

    /// Default: 30s
    pub max_delay: Duration,

    /// Bound on one request/response attempt, and on each wait for the next
    /// chunk of a body stream.
    ///
    /// Default: 60s
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts:    3,
            base_delay:      Duration::from_millis(500),
            max_delay:       Duration::from_secs(30),
            attempt_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl RetryPolicy {
    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    #[must_use]
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    #[must_use]
    pub fn attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn attempts(&self) -> u32 { self.max_attempts.max(1) }

    /// Un-jittered delay before retry `retry` (0-based), capped at `max_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        retry_delay(retry, self.base_delay).min(self.max_delay)
    }

    /// "Equal jitter": half of the backoff is fixed, the other half uniform.
    pub fn jittered_delay<R: Rng>(&self, retry: u32, rng: &mut R) -> Duration {
        let delay = self.backoff(retry);
        let half = delay / 2;
        let spread = u64::try_from((delay - half).as_nanos()).unwrap_or(u64::MAX);
        half + Duration::from_nanos(rng.random_range(0..=spread))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_retry_delay_basic() {
        let base = Duration::from_millis(100);
        assert_eq!(retry_delay(0, base), Duration::from_millis(100));
        assert_eq!(retry_delay(1, base), Duration::from_millis(200));
        assert_eq!(retry_delay(2, base), Duration::from_millis(400));
        assert_eq!(retry_delay(3, base), Duration::from_millis(800));
    }

    #[test]
    fn test_retry_delay_zero_base() {
        let base = Duration::from_millis(0);
        assert_eq!(retry_delay(0, base), Duration::ZERO);
        assert_eq!(retry_delay(10, base), Duration::ZERO);
    }

    #[test]
    fn test_retry_delay_overflow_protection() {
        let base = Duration::from_secs(u64::MAX / 2);
        assert!(retry_delay(40, base) > Duration::ZERO);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(20), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_in_upper_half() {
        let policy = RetryPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);
        for retry in 0..8 {
            let full = policy.backoff(retry);
            for _ in 0..50 {
                let d = policy.jittered_delay(retry, &mut rng);
                assert!(d >= full / 2 && d <= full, "{d:?} outside [{:?}, {full:?}]", full / 2);
            }
        }
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let policy = RetryPolicy::default().max_attempts(0);
        assert_eq!(policy.attempts(), 1);
    }
}
