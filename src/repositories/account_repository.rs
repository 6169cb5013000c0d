use crate::error::{AppError, Result};
use crate::models::Account;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

/// Repository for Account rows. Writes only ever happen inside the ledger engine's
/// ordered-lock transaction (§4.1); this repository exposes the row-lock primitive
/// directly rather than hiding it behind a generic "update" call.
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, initial_balance: Decimal) -> Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (balance, version, created_at)
            VALUES ($1, 0, NOW())
            RETURNING id, balance, version, created_at
            "#,
        )
        .bind(initial_balance)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from_sqlx_transient)?;

        Ok(account)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, balance, version, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_sqlx_transient)?;

        Ok(account)
    }

    /// Acquires a row-exclusive lock on a single account inside the given transaction.
    /// Callers MUST invoke this twice, in ascending `id` order, to implement the ordered
    /// locking discipline that is the sole deadlock-avoidance mechanism (§4.1 step 3).
    pub async fn lock_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
    ) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, balance, version, created_at
            FROM accounts
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::from_sqlx_transient)?;

        Ok(account)
    }

    /// Applies a new balance to an already-locked account row, bumping `version`.
    pub async fn update_balance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
        new_balance: Decimal,
    ) -> Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET balance = $2, version = version + 1
            WHERE id = $1
            RETURNING id, balance, version, created_at
            "#,
        )
        .bind(id)
        .bind(new_balance)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::from_sqlx_transient)?;

        Ok(account)
    }
}
