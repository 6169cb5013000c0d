use crate::context::RequestContext;
use crate::coordinator::pool::WorkerPool;
use crate::error::{AppError, Result};
use crate::models::{TransferRecord, TransferStatus};
use crate::repositories::TransferRecordRepository;
use crate::resilience::client::LedgerCallOutcome;
use crate::resilience::ResilientLedgerClient;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// How long one asynchronous application attempt is allowed before the resilient client
/// gives up and reports `Unavailable`, independent of the retry/breaker budget itself.
const APPLICATION_DEADLINE: Duration = Duration::from_secs(30);

/// What `createTransfer` hands back to its caller (§4.4 step 2 vs step 3/4).
pub enum CreateTransferOutcome {
    /// A brand-new intent was persisted and dispatched to the pool.
    Dispatched(TransferRecord),
    /// A prior record for this `idempotency_key` already existed and is returned verbatim.
    Existing(TransferRecord),
}

impl CreateTransferOutcome {
    pub fn into_record(self) -> TransferRecord {
        match self {
            CreateTransferOutcome::Dispatched(r) => r,
            CreateTransferOutcome::Existing(r) => r,
        }
    }
}

/// Outcome of resolving an idempotency key to a transfer record, shared by the two
/// public entry points below: a brand-new PENDING intent that still needs dispatch, or
/// a prior record already on file (verbatim reconciliation of §4.4 step 2).
enum IntentResolution {
    New(TransferRecord),
    Existing(TransferRecord),
}

/// The idempotent request front-end (§4.4). Assigns transfer identifiers, persists
/// intent before effecting movement, and dispatches asynchronous application onto the
/// shared worker pool.
#[derive(Clone)]
pub struct TransferCoordinator {
    transfer_records: TransferRecordRepository,
    ledger_client: Arc<ResilientLedgerClient>,
    pool: WorkerPool,
}

impl TransferCoordinator {
    pub fn new(
        transfer_records: TransferRecordRepository,
        ledger_client: Arc<ResilientLedgerClient>,
        pool: WorkerPool,
    ) -> Self {
        Self { transfer_records, ledger_client, pool }
    }

    /// Steps 1-3 of §4.4: validate, probe for an existing idempotency-key record, and
    /// persist a new PENDING intent if none exists. Shared by `create_transfer` (which
    /// dispatches fire-and-forget and returns PENDING immediately, per §4.4 step 4) and
    /// `create_transfer_and_await` (which the batch dispatcher uses instead, per §4.5's
    /// "await all completions").
    async fn resolve_intent(
        &self,
        idempotency_key: &str,
        from_account_id: i64,
        to_account_id: i64,
        amount: Decimal,
    ) -> Result<IntentResolution> {
        // Step 1: validation.
        if idempotency_key.trim().is_empty() {
            return Err(AppError::InvalidRequest("idempotencyKey must not be empty".to_string()));
        }
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidRequest("amount must be strictly positive".to_string()));
        }
        if from_account_id == to_account_id {
            return Err(AppError::InvalidRequest(
                "fromAccountId and toAccountId must differ".to_string(),
            ));
        }

        let request_hash = TransferRecord::request_digest(from_account_id, to_account_id, amount);

        // Step 2: idempotency probe.
        if let Some(existing) = self.transfer_records.find_by_idempotency_key(idempotency_key).await? {
            return Ok(IntentResolution::Existing(reconcile(existing, &request_hash)?));
        }

        // Step 3: persist intent.
        let now = Utc::now();
        let candidate = TransferRecord {
            id: 0,
            transfer_id: Uuid::new_v4().to_string(),
            idempotency_key: idempotency_key.to_string(),
            from_account_id,
            to_account_id,
            amount,
            status: TransferStatus::Pending,
            error_message: None,
            request_hash: request_hash.clone(),
            created_at: now,
            updated_at: now,
        };

        let persisted = self.transfer_records.try_insert(&candidate).await?;

        if persisted.transfer_id != candidate.transfer_id {
            // Lost the race for this idempotency_key; the winning row is authoritative.
            return Ok(IntentResolution::Existing(reconcile(persisted, &request_hash)?));
        }

        Ok(IntentResolution::New(persisted))
    }

    pub async fn create_transfer(
        &self,
        ctx: &RequestContext,
        idempotency_key: &str,
        from_account_id: i64,
        to_account_id: i64,
        amount: Decimal,
    ) -> Result<CreateTransferOutcome> {
        match self.resolve_intent(idempotency_key, from_account_id, to_account_id, amount).await? {
            IntentResolution::New(record) => {
                // Step 4: dispatch, return PENDING immediately.
                self.dispatch(ctx.clone(), record.clone()).await;
                Ok(CreateTransferOutcome::Dispatched(record))
            }
            IntentResolution::Existing(record) => Ok(CreateTransferOutcome::Existing(record)),
        }
    }

    /// Used by `BatchDispatcher::process_batch` (§4.5), which must "submit each intent
    /// to `createTransfer` via the shared worker pool" and "await all completions"
    /// rather than observe the PENDING record `create_transfer` returns. Resolves the
    /// intent exactly as `create_transfer` does, then — for a fresh intent — submits its
    /// application through the same `WorkerPool` `dispatch` uses and awaits the
    /// COMPLETED/FAILED record it produces. A pre-existing record (idempotency replay)
    /// is returned as-is, matching `create_transfer`'s own verbatim-reconciliation rule.
    pub async fn create_transfer_and_await(
        &self,
        ctx: &RequestContext,
        idempotency_key: &str,
        from_account_id: i64,
        to_account_id: i64,
        amount: Decimal,
    ) -> Result<TransferRecord> {
        match self.resolve_intent(idempotency_key, from_account_id, to_account_id, amount).await? {
            IntentResolution::New(record) => self.dispatch_and_await(ctx.clone(), record).await,
            IntentResolution::Existing(record) => Ok(record),
        }
    }

    pub async fn get_transfer(&self, transfer_id: &str) -> Result<Option<TransferRecord>> {
        self.transfer_records.find_by_transfer_id(transfer_id).await
    }

    /// Submits one record for asynchronous application, used both by `create_transfer`'s
    /// own dispatch step and by the recovery sweep's re-dispatch of stale PENDING rows.
    /// `ctx`'s `correlation_id` carries the originating request's id end-to-end into the
    /// detached pool task (§5, §7); the recovery sweep has no originating request and
    /// passes a freshly generated one instead. Fire-and-forget: the caller gets PENDING
    /// back immediately and the terminal status is observed later via `get_transfer`.
    pub async fn dispatch(&self, ctx: RequestContext, record: TransferRecord) {
        let coordinator = self.clone();
        self.pool
            .submit(async move {
                let _ = coordinator.apply_and_finalize(ctx, record).await;
            })
            .await;
    }

    /// Submits one record for asynchronous application through the same `WorkerPool` as
    /// `dispatch`, but awaits its terminal record instead of returning immediately. Used
    /// by `create_transfer_and_await` for the batch path (§4.5).
    async fn dispatch_and_await(&self, ctx: RequestContext, record: TransferRecord) -> Result<TransferRecord> {
        let coordinator = self.clone();
        self.pool.submit_and_wait(async move { coordinator.apply_and_finalize(ctx, record).await }).await
    }

    /// The asynchronous application step (§4.4): one attempt through the resilient
    /// client, then a terminal-status persist that is itself idempotent w.r.t. re-entry.
    /// Returns the persisted terminal record so `dispatch_and_await` can hand it back.
    async fn apply_and_finalize(&self, ctx: RequestContext, record: TransferRecord) -> Result<TransferRecord> {
        let ctx = ctx.with_timeout(APPLICATION_DEADLINE);
        let outcome = self
            .ledger_client
            .apply_transfer(&record.transfer_id, record.from_account_id, record.to_account_id, record.amount, &ctx)
            .await;

        let result = match outcome {
            LedgerCallOutcome::Applied => {
                self.transfer_records.mark_completed(&record.transfer_id).await
            }
            LedgerCallOutcome::Rejected(reason) => {
                self.transfer_records.mark_failed(&record.transfer_id, &reason).await
            }
            LedgerCallOutcome::Unavailable => {
                self.transfer_records
                    .mark_failed(&record.transfer_id, "ledger unavailable")
                    .await
            }
        };

        match result {
            Ok(Some(updated)) => Ok(updated),
            // `mark_completed`/`mark_failed` only match rows still PENDING (invariant 7);
            // a `None` here means something else already finalized this transfer_id
            // (e.g. the recovery sweep raced this same dispatch). Re-read rather than
            // treat it as an error.
            Ok(None) => self.transfer_records.find_by_transfer_id(&record.transfer_id).await?.ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "transfer record {} vanished after application",
                    record.transfer_id
                ))
            }),
            Err(err) => {
                tracing::error!(
                    correlation_id = %ctx.correlation_id,
                    transfer_id = %record.transfer_id,
                    error = %err,
                    "failed to persist terminal transfer status"
                );
                Err(err)
            }
        }
    }
}

fn reconcile(existing: TransferRecord, request_hash: &str) -> Result<TransferRecord> {
    if existing.request_hash != request_hash {
        return Err(AppError::IdempotencyConflict);
    }
    Ok(existing)
}
