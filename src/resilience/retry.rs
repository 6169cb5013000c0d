use crate::config::RetrySettings;
use rand::Rng;
use std::time::Duration;

/// Bounded exponential backoff with full jitter, for retrying transient failures talking
/// to the ledger facade (§5). Deterministic rejections are never retried by this policy;
/// callers decide what counts as retryable before consulting it.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
        }
    }

    /// Delay to sleep before the given attempt number (1-based: the retry *after*
    /// attempt 1 is `delay_for(1)`). Full jitter: uniformly sampled between zero and the
    /// capped exponential ceiling, so that many callers backing off together don't
    /// re-collide in lockstep.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.initial_backoff.as_millis().saturating_mul(1u128 << attempt.min(20));
        let ceiling = exp.min(self.max_backoff.as_millis()).max(1) as u64;
        let jittered = rand::thread_rng().gen_range(0..=ceiling);
        Duration::from_millis(jittered)
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RetrySettings {
        RetrySettings { max_attempts: 3, initial_backoff_ms: 50, max_backoff_ms: 1000 }
    }

    #[test]
    fn should_retry_respects_max_attempts() {
        let policy = RetryPolicy::new(&settings());
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn delay_is_capped_at_max_backoff() {
        let policy = RetryPolicy::new(&settings());
        for attempt in 0..10 {
            let delay = policy.delay_for(attempt);
            assert!(delay.as_millis() <= 1000);
        }
    }
}
