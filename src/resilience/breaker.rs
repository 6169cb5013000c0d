use crate::config::BreakerSettings;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Circuit breaker state, reported for observability and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: BreakerState,
    /// Most recent outcomes, `true` = success. Bounded to `window_size`.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    /// Set once a half-open probe is in flight, so concurrent callers don't all probe.
    probe_in_flight: bool,
}

/// A rolling-window circuit breaker over calls to the ledger facade (§5 "Resilient
/// Ledger Client"). CLOSED lets calls through and tracks a sliding window of outcomes;
/// once the failure rate over a full window crosses `failure_rate_threshold` it trips to
/// OPEN and rejects calls outright for `open_duration`; after that it allows exactly one
/// HALF_OPEN probe, closing again on success or re-opening on failure.
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    window_size: usize,
    failure_rate_threshold: f64,
    open_duration: Duration,
}

/// What the caller should do, returned by `before_call`.
pub enum Admission {
    Allow,
    Reject,
}

impl CircuitBreaker {
    pub fn new(settings: &BreakerSettings) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                window: VecDeque::with_capacity(settings.window_size),
                opened_at: None,
                probe_in_flight: false,
            }),
            window_size: settings.window_size.max(1),
            failure_rate_threshold: settings.failure_rate_threshold,
            open_duration: Duration::from_millis(settings.open_duration_ms),
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().unwrap().state
    }

    /// Call before issuing a request. Returns `Reject` if the breaker is OPEN and the
    /// cooldown has not yet elapsed, or if a HALF_OPEN probe is already in flight.
    pub fn before_call(&self) -> Admission {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::Closed => Admission::Allow,
            BreakerState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.open_duration {
                    inner.state = BreakerState::HalfOpen;
                    inner.probe_in_flight = true;
                    Admission::Allow
                } else {
                    Admission::Reject
                }
            }
            BreakerState::HalfOpen => {
                if inner.probe_in_flight {
                    Admission::Reject
                } else {
                    inner.probe_in_flight = true;
                    Admission::Allow
                }
            }
        }
    }

    /// Call after a request completes, with whether it succeeded.
    pub fn record(&self, success: bool) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::HalfOpen => {
                inner.probe_in_flight = false;
                if success {
                    inner.state = BreakerState::Closed;
                    inner.window.clear();
                } else {
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            BreakerState::Closed => {
                if inner.window.len() == self.window_size {
                    inner.window.pop_front();
                }
                inner.window.push_back(success);

                if inner.window.len() == self.window_size {
                    let failures = inner.window.iter().filter(|ok| !**ok).count();
                    let failure_rate = failures as f64 / self.window_size as f64;
                    if failure_rate >= self.failure_rate_threshold {
                        inner.state = BreakerState::Open;
                        inner.opened_at = Some(Instant::now());
                        inner.window.clear();
                    }
                }
            }
            BreakerState::Open => {
                // A call squeezed through between before_call's elapsed check and here;
                // treat it like any other result without disturbing the open timer.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(threshold: f64, window: usize, open_ms: u64) -> BreakerSettings {
        BreakerSettings {
            failure_rate_threshold: threshold,
            window_size: window,
            open_duration_ms: open_ms,
        }
    }

    #[test]
    fn stays_closed_below_threshold() {
        let breaker = CircuitBreaker::new(&settings(0.5, 4, 1000));
        breaker.record(true);
        breaker.record(false);
        breaker.record(true);
        breaker.record(true);
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn trips_open_at_threshold() {
        let breaker = CircuitBreaker::new(&settings(0.5, 4, 1000));
        breaker.record(false);
        breaker.record(false);
        breaker.record(true);
        breaker.record(true);
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(matches!(breaker.before_call(), Admission::Reject));
    }

    #[test]
    fn half_open_probe_closes_on_success() {
        let breaker = CircuitBreaker::new(&settings(0.5, 2, 0));
        breaker.record(false);
        breaker.record(false);
        assert_eq!(breaker.state(), BreakerState::Open);

        assert!(matches!(breaker.before_call(), Admission::Allow));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record(true);
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_probe_reopens_on_failure() {
        let breaker = CircuitBreaker::new(&settings(0.5, 2, 0));
        breaker.record(false);
        breaker.record(false);
        let _ = breaker.before_call();
        breaker.record(false);
        assert_eq!(breaker.state(), BreakerState::Open);
    }
}
