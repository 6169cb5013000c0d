use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Global metrics instance.
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Metrics surface for the ledger engine and transfer coordinator. Narrowed to this
/// system's actual operations (transfer lifecycle, the breaker, retries, the worker
/// pool) rather than a generic settlement/netting domain.
#[derive(Debug, Clone, Default)]
pub struct Metrics;

impl Metrics {
    pub fn new() -> Self {
        Self
    }

    pub fn record_account_created(&self) {
        counter!("ledger_accounts_created_total").increment(1);
    }

    pub fn record_transfer_applied(&self, already_applied: bool) {
        if already_applied {
            counter!("ledger_transfers_already_applied_total").increment(1);
        } else {
            counter!("ledger_transfers_applied_total").increment(1);
        }
    }

    pub fn record_transfer_rejected(&self, reason: &'static str) {
        counter!("ledger_transfers_rejected_total", "reason" => reason).increment(1);
    }

    pub fn record_apply_transfer_latency(&self, duration_ms: f64) {
        histogram!("ledger_apply_transfer_duration_ms").record(duration_ms);
    }

    pub fn record_transfer_created(&self) {
        counter!("coordinator_transfers_created_total").increment(1);
    }

    pub fn record_transfer_completed(&self) {
        counter!("coordinator_transfers_completed_total").increment(1);
    }

    pub fn record_transfer_failed(&self, reason: &'static str) {
        counter!("coordinator_transfers_failed_total", "reason" => reason).increment(1);
    }

    pub fn record_idempotency_replay(&self) {
        counter!("coordinator_idempotency_replays_total").increment(1);
    }

    pub fn record_idempotency_conflict(&self) {
        counter!("coordinator_idempotency_conflicts_total").increment(1);
    }

    pub fn record_batch_processed(&self, size: u64) {
        counter!("coordinator_batches_processed_total").increment(1);
        histogram!("coordinator_batch_size").record(size as f64);
    }

    pub fn record_retry_attempt(&self, attempt: u32) {
        counter!("resilience_retry_attempts_total").increment(1);
        histogram!("resilience_retry_attempt_number").record(attempt as f64);
    }

    pub fn record_breaker_rejection(&self) {
        counter!("resilience_breaker_rejections_total").increment(1);
    }

    pub fn set_breaker_state(&self, state: &'static str) {
        gauge!("resilience_breaker_state", "state" => state).set(1.0);
    }

    pub fn set_worker_pool_in_flight(&self, count: i64) {
        gauge!("coordinator_worker_pool_in_flight").set(count as f64);
    }

    pub fn record_recovery_sweep(&self, redispatched: u64) {
        counter!("coordinator_recovery_sweep_redispatched_total").increment(redispatched);
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_ms: f64) {
        counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string(), "status" => status.to_string())
            .increment(1);
        histogram!("http_request_duration_ms", "method" => method.to_string(), "path" => path.to_string())
            .record(duration_ms);
    }

    pub fn record_db_query(&self, query_type: &str, duration_ms: f64, success: bool) {
        counter!("db_queries_total", "type" => query_type.to_string(), "success" => success.to_string()).increment(1);
        histogram!("db_query_duration_ms", "type" => query_type.to_string()).record(duration_ms);
    }
}

/// Timer for measuring operation latency.
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Initializes the metrics system and returns the Prometheus handle. Safe to call more
/// than once per process (each binary calls it exactly once at startup); the recorder
/// itself is installed only the first time.
pub fn init_metrics() -> PrometheusHandle {
    let handle = METRICS_HANDLE.get_or_init(|| {
        let builder = PrometheusBuilder::new();
        let handle = builder.install_recorder().expect("failed to install Prometheus recorder");
        describe_metrics();
        handle
    });

    METRICS.get_or_init(Metrics::new);

    handle.clone()
}

fn describe_metrics() {
    describe_counter!("ledger_accounts_created_total", Unit::Count, "Total accounts created");
    describe_counter!("ledger_transfers_applied_total", Unit::Count, "Total transfers newly applied");
    describe_counter!("ledger_transfers_already_applied_total", Unit::Count, "Total transfers that were replays");
    describe_counter!("ledger_transfers_rejected_total", Unit::Count, "Total deterministic transfer rejections");
    describe_histogram!("ledger_apply_transfer_duration_ms", Unit::Milliseconds, "applyTransfer latency");

    describe_counter!("coordinator_transfers_created_total", Unit::Count, "Total transfer intents accepted");
    describe_counter!("coordinator_transfers_completed_total", Unit::Count, "Total transfers that completed");
    describe_counter!("coordinator_transfers_failed_total", Unit::Count, "Total transfers that failed");
    describe_counter!("coordinator_idempotency_replays_total", Unit::Count, "Total idempotency-key replays");
    describe_counter!("coordinator_idempotency_conflicts_total", Unit::Count, "Total idempotency-key conflicts");
    describe_counter!("coordinator_batches_processed_total", Unit::Count, "Total batches processed");
    describe_histogram!("coordinator_batch_size", Unit::Count, "Size of processed batches");
    describe_counter!("coordinator_recovery_sweep_redispatched_total", Unit::Count, "Stale pending transfers re-dispatched by the recovery sweep");
    describe_gauge!("coordinator_worker_pool_in_flight", Unit::Count, "In-flight worker pool tasks");

    describe_counter!("resilience_retry_attempts_total", Unit::Count, "Total retry attempts against the ledger facade");
    describe_counter!("resilience_breaker_rejections_total", Unit::Count, "Total calls rejected by the open breaker");
    describe_gauge!("resilience_breaker_state", Unit::Count, "Current breaker state (one gauge per state label)");

    describe_counter!("http_requests_total", Unit::Count, "Total HTTP requests");
    describe_histogram!("http_request_duration_ms", Unit::Milliseconds, "HTTP request latency");
    describe_counter!("db_queries_total", Unit::Count, "Total database queries");
    describe_histogram!("db_query_duration_ms", Unit::Milliseconds, "Database query latency");
}

/// Returns the global metrics instance.
pub fn get_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_timer() {
        let timer = LatencyTimer::new();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10.0);
    }
}
