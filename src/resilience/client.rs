use crate::config::{BreakerSettings, LedgerClientSettings, RetrySettings};
use crate::context::RequestContext;
use crate::resilience::breaker::{Admission, CircuitBreaker};
use crate::resilience::retry::RetryPolicy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the coordinator sees after asking the ledger to apply a transfer (§4.3).
pub enum LedgerCallOutcome {
    Applied,
    /// A deterministic 4xx rejection, carrying the ledger's structured reason.
    Rejected(String),
    /// Retries exhausted, or the breaker is open. Never retried further by this client.
    Unavailable,
}

#[derive(Serialize)]
struct ApplyTransferRequest {
    #[serde(rename = "transferId")]
    transfer_id: String,
    #[serde(rename = "fromAccountId")]
    from_account_id: i64,
    #[serde(rename = "toAccountId")]
    to_account_id: i64,
    amount: Decimal,
}

#[derive(Deserialize)]
struct ApplyTransferResponse {
    success: bool,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct RejectionBody {
    #[serde(default)]
    message: String,
}

enum Attempt {
    Applied,
    Rejected(String),
    Transient,
}

/// Wraps the HTTP call from the transfer coordinator to the ledger facade behind retry
/// and a circuit breaker (§4.3). One instance is shared across all worker pool tasks.
pub struct ResilientLedgerClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl ResilientLedgerClient {
    pub fn new(
        ledger_client: &LedgerClientSettings,
        retry: &RetrySettings,
        breaker: &BreakerSettings,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(ledger_client.request_timeout_ms))
            .build()
            .expect("reqwest client builds with static configuration");

        Self {
            http,
            base_url: ledger_client.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::new(retry),
            breaker: CircuitBreaker::new(breaker),
        }
    }

    pub async fn apply_transfer(
        &self,
        transfer_id: &str,
        from_account_id: i64,
        to_account_id: i64,
        amount: Decimal,
        ctx: &RequestContext,
    ) -> LedgerCallOutcome {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            if matches!(self.breaker.before_call(), Admission::Reject) {
                tracing::warn!(
                    correlation_id = %ctx.correlation_id,
                    transfer_id,
                    "ledger call rejected, breaker open"
                );
                return LedgerCallOutcome::Unavailable;
            }

            let outcome = self
                .send_once(transfer_id, from_account_id, to_account_id, amount, ctx)
                .await;

            match outcome {
                Attempt::Applied => {
                    self.breaker.record(true);
                    return LedgerCallOutcome::Applied;
                }
                Attempt::Rejected(reason) => {
                    // A deterministic 4xx is not a breaker failure: the ledger is reachable
                    // and behaving correctly, it is simply refusing this request.
                    self.breaker.record(true);
                    return LedgerCallOutcome::Rejected(reason);
                }
                Attempt::Transient => {
                    self.breaker.record(false);
                    if ctx.is_expired() || !self.retry.should_retry(attempt) {
                        return LedgerCallOutcome::Unavailable;
                    }
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                }
            }
        }
    }

    async fn send_once(
        &self,
        transfer_id: &str,
        from_account_id: i64,
        to_account_id: i64,
        amount: Decimal,
        ctx: &RequestContext,
    ) -> Attempt {
        let body = ApplyTransferRequest {
            transfer_id: transfer_id.to_string(),
            from_account_id,
            to_account_id,
            amount,
        };

        let request = self
            .http
            .post(format!("{}/ledger/transfer", self.base_url))
            .header("X-Request-ID", ctx.correlation_id.clone())
            .json(&body);

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(
                    correlation_id = %ctx.correlation_id,
                    transfer_id,
                    error = %err,
                    "ledger call failed (connection error or timeout)"
                );
                return Attempt::Transient;
            }
        };

        let status = response.status();
        if status.is_success() {
            match response.json::<ApplyTransferResponse>().await {
                Ok(parsed) if parsed.success => Attempt::Applied,
                Ok(parsed) => {
                    tracing::warn!(
                        correlation_id = %ctx.correlation_id,
                        transfer_id,
                        "ledger reported success=false with a 2xx status"
                    );
                    Attempt::Rejected(parsed.message)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "malformed ledger success body");
                    Attempt::Transient
                }
            }
        } else if status.is_client_error() {
            let reason = response
                .json::<RejectionBody>()
                .await
                .map(|b| b.message)
                .unwrap_or_else(|_| "ledger rejected the request".to_string());
            Attempt::Rejected(reason)
        } else {
            Attempt::Transient
        }
    }
}
