use ledger_platform::api::{create_transfer_router, TransferAppState};
use ledger_platform::config::CoordinatorSettings;
use ledger_platform::coordinator::{BatchDispatcher, RecoverySweep, TransferCoordinator, WorkerPool};
use ledger_platform::observability::{init_logging, init_metrics, LogConfig, LogFormat};
use ledger_platform::repositories::TransferRecordRepository;
use ledger_platform::resilience::ResilientLedgerClient;
use ledger_platform::schema::{self, DdlPolicy};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// Entry point for the Resilient Ledger Client + Transfer Coordinator + Batch
/// Dispatcher + Transfer HTTP Facade process (§4.3-4.6). Owns `transfer_records` only;
/// talks to the ledger facade exclusively over HTTP, never sharing a transaction with it.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = CoordinatorSettings::load()?;

    init_logging(&LogConfig {
        level: settings.logging.level.clone(),
        format: LogFormat::from(settings.logging.format.as_str()),
        include_target: true,
        include_file: false,
        include_line: false,
    });

    let metrics_handle = init_metrics();
    info!("transfer_facade: configuration loaded, metrics initialized");

    let pool = PgPoolOptions::new()
        .max_connections(settings.database.pool_size)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.database.url)
        .await?;
    info!("transfer_facade: database connection established");

    let ddl_policy = DdlPolicy::parse(&settings.database.ddl_policy)?;
    schema::apply_coordinator_schema(&pool, ddl_policy, settings.database.allow_destructive_ddl).await?;
    info!(policy = settings.database.ddl_policy.as_str(), "transfer_facade: schema applied");

    let transfer_records = TransferRecordRepository::new(pool.clone());
    let ledger_client = Arc::new(ResilientLedgerClient::new(&settings.ledger_client, &settings.retry, &settings.breaker));
    let pool_workers = WorkerPool::new(settings.pool.worker_count);
    let coordinator = TransferCoordinator::new(transfer_records.clone(), ledger_client, pool_workers);
    let batch_dispatcher = BatchDispatcher::new(coordinator.clone(), settings.pool.batch_cap);

    let recovery_sweep = RecoverySweep::new(transfer_records, coordinator.clone(), &settings.recovery_sweep);
    recovery_sweep.spawn();
    info!("transfer_facade: recovery sweep started");

    let state = TransferAppState::new(pool, coordinator, batch_dispatcher, Some(metrics_handle));
    let app = create_transfer_router(state);

    let addr = format!("0.0.0.0:{}", settings.application.port);
    info!("transfer_facade: starting HTTP server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
