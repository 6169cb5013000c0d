mod common;

use common::{cleanup_test_data, setup_test_db, spawn_fake_ledger, FAKE_LEDGER_ALWAYS_FAIL};
use ledger_platform::api::{create_ledger_router, create_transfer_router, LedgerAppState, TransferAppState};
use ledger_platform::config::{BreakerSettings, LedgerClientSettings, RetrySettings};
use ledger_platform::coordinator::{BatchDispatcher, TransferCoordinator, WorkerPool};
use ledger_platform::repositories::TransferRecordRepository;
use ledger_platform::resilience::ResilientLedgerClient;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

async fn spawn_router(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn spawn_ledger_facade() -> (String, sqlx::PgPool) {
    let pool = setup_test_db().await;
    cleanup_test_data(&pool).await;
    let state = LedgerAppState::new(pool.clone(), None);
    let base_url = spawn_router(create_ledger_router(state)).await;
    (base_url, pool)
}

async fn spawn_transfer_facade_against(ledger_base_url: String, pool: sqlx::PgPool) -> String {
    let client = Arc::new(ResilientLedgerClient::new(
        &LedgerClientSettings { base_url: ledger_base_url, request_timeout_ms: 1000 },
        &RetrySettings { max_attempts: 2, initial_backoff_ms: 5, max_backoff_ms: 20 },
        &BreakerSettings { failure_rate_threshold: 0.5, window_size: 4, open_duration_ms: 50 },
    ));
    let records = TransferRecordRepository::new(pool.clone());
    let coordinator = TransferCoordinator::new(records, client, WorkerPool::new(4));
    let batch_dispatcher = BatchDispatcher::new(coordinator.clone(), 20);
    let state = TransferAppState::new(pool, coordinator, batch_dispatcher, None);
    spawn_router(create_transfer_router(state)).await
}

#[tokio::test]
async fn ledger_facade_creates_and_reads_accounts() {
    let (base, _pool) = spawn_ledger_facade().await;
    let client = reqwest::Client::new();

    let created: Value = client
        .post(format!("{base}/accounts"))
        .json(&json!({"initialBalance": "500.00"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created["success"], true);
    let id = created["data"]["id"].as_i64().unwrap();

    let fetched: Value = client.get(format!("{base}/accounts/{id}")).send().await.unwrap().json().await.unwrap();
    assert_eq!(fetched["data"]["balance"], "500.00");
}

#[tokio::test]
async fn ledger_facade_rejects_non_positive_initial_balance() {
    let (base, _pool) = spawn_ledger_facade().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/accounts"))
        .json(&json!({"initialBalance": "0"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn transfer_facade_requires_idempotency_key_header() {
    let (ledger_base, pool) = spawn_ledger_facade().await;
    let base = spawn_transfer_facade_against(ledger_base, pool).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/transfers"))
        .json(&json!({"fromAccountId": 1, "toAccountId": 2, "amount": "10.00"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn scenario_6_ledger_down_end_to_end_settles_to_failed() {
    let pool = setup_test_db().await;
    cleanup_test_data(&pool).await;

    let (fake_base, _mode) = spawn_fake_ledger(FAKE_LEDGER_ALWAYS_FAIL).await;
    let transfer_base = spawn_transfer_facade_against(fake_base, pool).await;

    let client = reqwest::Client::new();
    let created: Value = client
        .post(format!("{transfer_base}/transfers"))
        .header("Idempotency-Key", "e2e-key-1")
        .json(&json!({"fromAccountId": 1, "toAccountId": 2, "amount": "10.00"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created["data"]["status"], "Pending");
    let transfer_id = created["data"]["transferId"].as_str().unwrap().to_string();

    let mut terminal = created.clone();
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        terminal = client
            .get(format!("{transfer_base}/transfers/{transfer_id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if terminal["data"]["status"] != "Pending" {
            break;
        }
    }
    assert_eq!(terminal["data"]["status"], "Failed");
    assert_eq!(terminal["data"]["errorMessage"], "ledger unavailable");

    let replay: Value = client
        .post(format!("{transfer_base}/transfers"))
        .header("Idempotency-Key", "e2e-key-1")
        .json(&json!({"fromAccountId": 1, "toAccountId": 2, "amount": "10.00"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(replay["data"]["transferId"], transfer_id);
    assert_eq!(replay["data"]["status"], "Failed");
}
