use crate::error::{AppError, Result};
use crate::models::{EntryType, JournalEntry};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

/// Repository for append-only journal entries.
pub struct JournalRepository {
    pool: PgPool,
}

/// Outcome of attempting to insert a transfer's debit/credit pair.
pub enum InsertPairOutcome {
    Inserted(JournalEntry, JournalEntry),
    /// The `(transfer_id, account_id, type)` unique index rejected a duplicate: a
    /// concurrent caller raced past the idempotency shortcut and got here first.
    AlreadyApplied,
}

impl JournalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotency shortcut (§4.1 step 2): a plain read, outside any mutating transaction.
    pub async fn exists_for_transfer(&self, transfer_id: &str) -> Result<bool> {
        let row: (bool,) = sqlx::query_as(
            r#"SELECT EXISTS(SELECT 1 FROM journal_entries WHERE transfer_id = $1)"#,
        )
        .bind(transfer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from_sqlx_transient)?;

        Ok(row.0)
    }

    pub async fn find_by_transfer(&self, transfer_id: &str) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT id, transfer_id, account_id, amount, type, created_at
            FROM journal_entries
            WHERE transfer_id = $1
            ORDER BY type
            "#,
        )
        .bind(transfer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from_sqlx_transient)?;

        Ok(rows)
    }

    /// Inserts the debit/credit pair for one transfer inside the caller's transaction.
    /// A unique-constraint violation on either insert is translated into
    /// `InsertPairOutcome::AlreadyApplied` rather than propagated as an error, per §4.1
    /// step 7: "return alreadyApplied, not a user error."
    pub async fn insert_pair(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        transfer_id: &str,
        from_account_id: i64,
        to_account_id: i64,
        amount: Decimal,
    ) -> Result<InsertPairOutcome> {
        let debit = match self
            .insert_one(tx, transfer_id, from_account_id, amount, EntryType::Debit)
            .await
        {
            Ok(entry) => entry,
            Err(e) if is_unique_violation(&e) => return Ok(InsertPairOutcome::AlreadyApplied),
            Err(e) => return Err(e),
        };

        let credit = match self
            .insert_one(tx, transfer_id, to_account_id, amount, EntryType::Credit)
            .await
        {
            Ok(entry) => entry,
            Err(e) if is_unique_violation(&e) => return Ok(InsertPairOutcome::AlreadyApplied),
            Err(e) => return Err(e),
        };

        Ok(InsertPairOutcome::Inserted(debit, credit))
    }

    async fn insert_one(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        transfer_id: &str,
        account_id: i64,
        amount: Decimal,
        entry_type: EntryType,
    ) -> Result<JournalEntry> {
        let entry = sqlx::query_as::<_, JournalEntry>(
            r#"
            INSERT INTO journal_entries (transfer_id, account_id, amount, type, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, transfer_id, account_id, amount, type, created_at
            "#,
        )
        .bind(transfer_id)
        .bind(account_id)
        .bind(amount)
        .bind(entry_type)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        Ok(entry)
    }
}

fn is_unique_violation(err: &AppError) -> bool {
    matches!(err, AppError::Database(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505"))
}
