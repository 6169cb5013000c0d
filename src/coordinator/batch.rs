use crate::context::RequestContext;
use crate::coordinator::transfer_coordinator::TransferCoordinator;
use crate::error::{AppError, Result};
use crate::models::{TransferRecord, TransferStatus};
use chrono::Utc;
use rust_decimal::Decimal;

/// One line of a batch request (§4.5).
#[derive(Debug, Clone)]
pub struct TransferIntent {
    pub idempotency_key: String,
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: Decimal,
}

/// `processBatch` (§4.5). Validates the batch envelope, then submits each intent to
/// `TransferCoordinator::create_transfer_and_await`, which resolves the intent and runs
/// its asynchronous application through the same shared `WorkerPool` single-transfer
/// dispatch uses — the `tokio::spawn` below only drives the intents concurrently; the
/// pool's semaphore is what actually bounds the expensive part (the outbound ledger
/// call). `process_batch` then awaits every spawned task so it returns each intent's
/// terminal COMPLETED/FAILED record, per "await all completions."
#[derive(Clone)]
pub struct BatchDispatcher {
    coordinator: TransferCoordinator,
    batch_cap: usize,
}

impl BatchDispatcher {
    pub fn new(coordinator: TransferCoordinator, batch_cap: usize) -> Self {
        Self { coordinator, batch_cap }
    }

    pub async fn process_batch(&self, ctx: &RequestContext, intents: Vec<TransferIntent>) -> Result<Vec<TransferRecord>> {
        if intents.is_empty() || intents.len() > self.batch_cap {
            return Err(AppError::InvalidRequest(format!(
                "batch size must be between 1 and {}",
                self.batch_cap
            )));
        }

        let handles: Vec<_> = intents
            .into_iter()
            .enumerate()
            .map(|(index, intent)| {
                let coordinator = self.coordinator.clone();
                // Each intent gets its own correlation id derived from the batch's, so
                // individual application attempts remain distinguishable in logs while
                // still tracing back to the originating batch request.
                let intent_ctx = RequestContext::new(format!("{}-{index}", ctx.correlation_id));
                tokio::spawn(async move { process_one(&coordinator, &intent_ctx, intent).await })
            })
            .collect();

        let mut records = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(record) => records.push(record),
                Err(join_err) => {
                    tracing::error!(error = %join_err, "batch intent task panicked");
                    records.push(failed_placeholder("batch intent task failed unexpectedly"));
                }
            }
        }

        Ok(records)
    }
}

async fn process_one(coordinator: &TransferCoordinator, ctx: &RequestContext, intent: TransferIntent) -> TransferRecord {
    match coordinator
        .create_transfer_and_await(ctx, &intent.idempotency_key, intent.from_account_id, intent.to_account_id, intent.amount)
        .await
    {
        Ok(record) => record,
        Err(err) => failed_record_for(&intent, &err),
    }
}

fn failed_record_for(intent: &TransferIntent, err: &AppError) -> TransferRecord {
    let now = Utc::now();
    TransferRecord {
        id: 0,
        transfer_id: String::new(),
        idempotency_key: intent.idempotency_key.clone(),
        from_account_id: intent.from_account_id,
        to_account_id: intent.to_account_id,
        amount: intent.amount,
        status: TransferStatus::Failed,
        error_message: Some(err.to_string()),
        request_hash: TransferRecord::request_digest(intent.from_account_id, intent.to_account_id, intent.amount),
        created_at: now,
        updated_at: now,
    }
}

fn failed_placeholder(reason: &str) -> TransferRecord {
    let now = Utc::now();
    TransferRecord {
        id: 0,
        transfer_id: String::new(),
        idempotency_key: String::new(),
        from_account_id: 0,
        to_account_id: 0,
        amount: Decimal::ZERO,
        status: TransferStatus::Failed,
        error_message: Some(reason.to_string()),
        request_hash: String::new(),
        created_at: now,
        updated_at: now,
    }
}
