use crate::error::{AppError, Result};
use crate::models::TransferRecord;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Repository for the transfer coordinator's own table.
#[derive(Clone)]
pub struct TransferRecordRepository {
    pool: PgPool,
}

impl TransferRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<TransferRecord>> {
        let row = sqlx::query_as::<_, TransferRecord>(
            r#"
            SELECT id, transfer_id, idempotency_key, from_account_id, to_account_id, amount,
                   status, error_message, request_hash, created_at, updated_at
            FROM transfer_records
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_sqlx_transient)?;

        Ok(row)
    }

    pub async fn find_by_transfer_id(&self, transfer_id: &str) -> Result<Option<TransferRecord>> {
        let row = sqlx::query_as::<_, TransferRecord>(
            r#"
            SELECT id, transfer_id, idempotency_key, from_account_id, to_account_id, amount,
                   status, error_message, request_hash, created_at, updated_at
            FROM transfer_records
            WHERE transfer_id = $1
            "#,
        )
        .bind(transfer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_sqlx_transient)?;

        Ok(row)
    }

    /// Attempts to persist a new PENDING record. If `idempotency_key` already exists the
    /// insert is turned into a harmless no-op update and the pre-existing row is returned
    /// instead, exactly mirroring the winner-takes-the-race trick this codebase already
    /// uses for idempotency storage: compare the returned transfer_id against the one we
    /// tried to insert to tell "we won" from "someone already holds this key".
    pub async fn try_insert(&self, record: &TransferRecord) -> Result<TransferRecord> {
        let row = sqlx::query_as::<_, TransferRecord>(
            r#"
            INSERT INTO transfer_records
                (transfer_id, idempotency_key, from_account_id, to_account_id, amount,
                 status, error_message, request_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (idempotency_key) DO UPDATE SET idempotency_key = transfer_records.idempotency_key
            RETURNING id, transfer_id, idempotency_key, from_account_id, to_account_id, amount,
                      status, error_message, request_hash, created_at, updated_at
            "#,
        )
        .bind(&record.transfer_id)
        .bind(&record.idempotency_key)
        .bind(record.from_account_id)
        .bind(record.to_account_id)
        .bind(record.amount)
        .bind(record.status)
        .bind(&record.error_message)
        .bind(&record.request_hash)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from_sqlx_transient)?;

        Ok(row)
    }

    /// Transitions a PENDING record to COMPLETED. Idempotent w.r.t. re-entry: the `WHERE
    /// status = 'PENDING'` guard means a record already in a terminal state is never
    /// overwritten (invariant 7 — terminality).
    pub async fn mark_completed(&self, transfer_id: &str) -> Result<Option<TransferRecord>> {
        let row = sqlx::query_as::<_, TransferRecord>(
            r#"
            UPDATE transfer_records
            SET status = 'COMPLETED', error_message = NULL, updated_at = NOW()
            WHERE transfer_id = $1 AND status = 'PENDING'
            RETURNING id, transfer_id, idempotency_key, from_account_id, to_account_id, amount,
                      status, error_message, request_hash, created_at, updated_at
            "#,
        )
        .bind(transfer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_sqlx_transient)?;

        Ok(row)
    }

    pub async fn mark_failed(
        &self,
        transfer_id: &str,
        error_message: &str,
    ) -> Result<Option<TransferRecord>> {
        let row = sqlx::query_as::<_, TransferRecord>(
            r#"
            UPDATE transfer_records
            SET status = 'FAILED', error_message = $2, updated_at = NOW()
            WHERE transfer_id = $1 AND status = 'PENDING'
            RETURNING id, transfer_id, idempotency_key, from_account_id, to_account_id, amount,
                      status, error_message, request_hash, created_at, updated_at
            "#,
        )
        .bind(transfer_id)
        .bind(error_message)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_sqlx_transient)?;

        Ok(row)
    }

    /// Claims PENDING records older than `older_than` for the recovery sweep (§4.4). The
    /// `updated_at` bump on claim means two coordinator instances racing the same sweep
    /// interval will not both pick up the same record.
    pub async fn claim_stale_pending(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<TransferRecord>> {
        let rows = sqlx::query_as::<_, TransferRecord>(
            r#"
            UPDATE transfer_records
            SET updated_at = NOW()
            WHERE id IN (
                SELECT id FROM transfer_records
                WHERE status = 'PENDING' AND updated_at < $1
                ORDER BY updated_at
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, transfer_id, idempotency_key, from_account_id, to_account_id, amount,
                      status, error_message, request_hash, created_at, updated_at
            "#,
        )
        .bind(older_than)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from_sqlx_transient)?;

        Ok(rows)
    }
}
