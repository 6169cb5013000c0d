use std::time::{Duration, Instant};

/// Explicit, threaded replacement for a thread-local correlation context.
///
/// Carried from the HTTP facade through the coordinator, into the worker-pool task that
/// performs asynchronous application, and into the resilient ledger client call. Every
/// tracing call site that touches a transfer attaches `correlation_id` so a request's
/// entire life — including its detached async step — shares one log thread.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: String,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            deadline: None,
        }
    }

    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.remaining(), Some(d) if d.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_distinct_ids() {
        let a = RequestContext::generate();
        let b = RequestContext::generate();
        assert_ne!(a.correlation_id, b.correlation_id);
    }

    #[test]
    fn with_timeout_eventually_expires() {
        let ctx = RequestContext::new("test").with_timeout(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(ctx.is_expired());
    }
}
