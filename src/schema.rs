use sqlx::PgPool;

/// Startup DDL policy, mirroring the enumerated `ddl_policy` config option (§6): one of
/// `create`, `create-drop`, `update`, `validate`, `none`. There is no migration-history
/// table here — the statements below are all `IF NOT EXISTS`, so `create` and `update`
/// converge on the same idempotent application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlPolicy {
    Create,
    CreateDrop,
    Update,
    Validate,
    None,
}

impl DdlPolicy {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw {
            "create" => Ok(DdlPolicy::Create),
            "create-drop" => Ok(DdlPolicy::CreateDrop),
            "update" => Ok(DdlPolicy::Update),
            "validate" => Ok(DdlPolicy::Validate),
            "none" => Ok(DdlPolicy::None),
            other => Err(format!(
                "unknown ddl_policy '{other}', expected one of create|create-drop|update|validate|none"
            )),
        }
    }
}

const LEDGER_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id BIGSERIAL PRIMARY KEY,
    balance NUMERIC(20, 4) NOT NULL CHECK (balance >= 0),
    version INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS journal_entries (
    id BIGSERIAL PRIMARY KEY,
    transfer_id VARCHAR(128) NOT NULL,
    account_id BIGINT NOT NULL REFERENCES accounts(id),
    amount NUMERIC(20, 4) NOT NULL CHECK (amount > 0),
    type VARCHAR(16) NOT NULL CHECK (type IN ('DEBIT', 'CREDIT')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE UNIQUE INDEX IF NOT EXISTS uq_journal_entries_transfer_account_type
    ON journal_entries (transfer_id, account_id, type);

CREATE INDEX IF NOT EXISTS idx_journal_entries_transfer_id ON journal_entries (transfer_id);
"#;

const COORDINATOR_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS transfer_records (
    id BIGSERIAL PRIMARY KEY,
    transfer_id VARCHAR(64) NOT NULL UNIQUE,
    idempotency_key VARCHAR(256) NOT NULL UNIQUE,
    from_account_id BIGINT NOT NULL,
    to_account_id BIGINT NOT NULL,
    amount NUMERIC(20, 4) NOT NULL CHECK (amount > 0),
    status VARCHAR(16) NOT NULL CHECK (status IN ('PENDING', 'COMPLETED', 'FAILED')),
    error_message TEXT,
    request_hash VARCHAR(64) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_transfer_records_status_updated_at
    ON transfer_records (status, updated_at);
"#;

/// Applies or validates the ledger engine's tables (`accounts`, `journal_entries`)
/// according to `policy`. `create-drop` additionally drops both tables first, and is
/// refused unless `allow_destructive_ddl` is set — this flag exists precisely so a
/// misconfigured `create-drop` in a shared environment can't silently wipe data.
pub async fn apply_ledger_schema(pool: &PgPool, policy: DdlPolicy, allow_destructive_ddl: bool) -> Result<(), sqlx::Error> {
    match policy {
        DdlPolicy::None => Ok(()),
        DdlPolicy::Validate => validate_tables(pool, &["accounts", "journal_entries"]).await,
        DdlPolicy::CreateDrop => {
            if !allow_destructive_ddl {
                panic!("ddl_policy=create-drop requires allow_destructive_ddl=true");
            }
            sqlx::query("DROP TABLE IF EXISTS journal_entries, accounts CASCADE").execute(pool).await?;
            sqlx::raw_sql(LEDGER_DDL).execute(pool).await?;
            Ok(())
        }
        DdlPolicy::Create | DdlPolicy::Update => {
            sqlx::raw_sql(LEDGER_DDL).execute(pool).await?;
            Ok(())
        }
    }
}

/// Applies or validates the coordinator's own table (`transfer_records`).
pub async fn apply_coordinator_schema(pool: &PgPool, policy: DdlPolicy, allow_destructive_ddl: bool) -> Result<(), sqlx::Error> {
    match policy {
        DdlPolicy::None => Ok(()),
        DdlPolicy::Validate => validate_tables(pool, &["transfer_records"]).await,
        DdlPolicy::CreateDrop => {
            if !allow_destructive_ddl {
                panic!("ddl_policy=create-drop requires allow_destructive_ddl=true");
            }
            sqlx::query("DROP TABLE IF EXISTS transfer_records CASCADE").execute(pool).await?;
            sqlx::raw_sql(COORDINATOR_DDL).execute(pool).await?;
            Ok(())
        }
        DdlPolicy::Create | DdlPolicy::Update => {
            sqlx::raw_sql(COORDINATOR_DDL).execute(pool).await?;
            Ok(())
        }
    }
}

async fn validate_tables(pool: &PgPool, names: &[&str]) -> Result<(), sqlx::Error> {
    for name in names {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(name)
        .fetch_one(pool)
        .await?;

        if !exists {
            panic!("ddl_policy=validate: table '{name}' does not exist");
        }
    }
    Ok(())
}
