use ledger_platform::api::{create_ledger_router, LedgerAppState};
use ledger_platform::config::LedgerSettings;
use ledger_platform::observability::{init_logging, init_metrics, LogConfig, LogFormat};
use ledger_platform::schema::{self, DdlPolicy};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// Entry point for the Ledger Engine + Ledger HTTP Facade process (§4.1 / §4.2). Owns
/// `accounts` and `journal_entries`; has no knowledge of the transfer coordinator.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = LedgerSettings::load()?;

    init_logging(&LogConfig {
        level: settings.logging.level.clone(),
        format: LogFormat::from(settings.logging.format.as_str()),
        include_target: true,
        include_file: false,
        include_line: false,
    });

    let metrics_handle = init_metrics();
    info!("ledger_facade: configuration loaded, metrics initialized");

    let pool = PgPoolOptions::new()
        .max_connections(settings.database.pool_size)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.database.url)
        .await?;
    info!("ledger_facade: database connection established");

    let ddl_policy = DdlPolicy::parse(&settings.database.ddl_policy)?;
    schema::apply_ledger_schema(&pool, ddl_policy, settings.database.allow_destructive_ddl).await?;
    info!(policy = settings.database.ddl_policy.as_str(), "ledger_facade: schema applied");

    let state = LedgerAppState::new(pool, Some(metrics_handle));
    let app = create_ledger_router(state);

    let addr = format!("0.0.0.0:{}", settings.application.port);
    info!("ledger_facade: starting HTTP server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
