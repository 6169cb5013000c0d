use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub pool_size: u32,
    /// `create` | `create-drop` | `update` | `validate` | `none`.
    pub ddl_policy: String,
    /// Must be explicitly set alongside `ddl_policy = "create-drop"`; refused otherwise.
    #[serde(default)]
    pub allow_destructive_ddl: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    /// `pretty` | `json` | `compact`.
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerApplicationSettings {
    pub port: u16,
}

/// Settings for the `ledger_facade` binary (Ledger Engine + Ledger HTTP Facade).
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSettings {
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub application: LedgerApplicationSettings,
}

impl LedgerSettings {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/ledger/default"))
            .add_source(config::File::with_name("config/ledger/local").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BreakerSettings {
    pub failure_rate_threshold: f64,
    pub window_size: usize,
    pub open_duration_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolSettings {
    pub worker_count: usize,
    pub batch_cap: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecoverySweepSettings {
    pub sweep_age_seconds: i64,
    pub interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerClientSettings {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorApplicationSettings {
    pub port: u16,
}

/// Settings for the `transfer_facade` binary (Resilient Ledger Client + Transfer
/// Coordinator + Batch Dispatcher + Transfer HTTP Facade).
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorSettings {
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub application: CoordinatorApplicationSettings,
    pub ledger_client: LedgerClientSettings,
    pub retry: RetrySettings,
    pub breaker: BreakerSettings,
    pub pool: PoolSettings,
    pub recovery_sweep: RecoverySweepSettings,
}

impl CoordinatorSettings {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/transfer/default"))
            .add_source(config::File::with_name("config/transfer/local").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }
}
