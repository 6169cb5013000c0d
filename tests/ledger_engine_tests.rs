mod common;

use common::{cleanup_test_data, setup_test_db};
use ledger_platform::error::AppError;
use ledger_platform::ledger::{ApplyOutcome, LedgerEngine};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

async fn engine() -> (LedgerEngine, sqlx::PgPool) {
    let pool = setup_test_db().await;
    cleanup_test_data(&pool).await;
    (LedgerEngine::new(pool.clone()), pool)
}

fn txid() -> String {
    Uuid::new_v4().to_string()
}

#[tokio::test]
async fn scenario_1_transfer_moves_balance_and_journals_both_sides() {
    let (engine, _pool) = engine().await;

    let a = engine.create_account(dec!(1000.00)).await.unwrap();
    let b = engine.create_account(dec!(500.00)).await.unwrap();
    let transfer_id = txid();

    let outcome = engine.apply_transfer(&transfer_id, a.id, b.id, dec!(100.00)).await.unwrap();
    assert!(matches!(outcome, ApplyOutcome::Applied { .. }));

    let a_after = engine.get_account(a.id).await.unwrap().unwrap();
    let b_after = engine.get_account(b.id).await.unwrap().unwrap();
    assert_eq!(a_after.balance, dec!(900.00));
    assert_eq!(b_after.balance, dec!(600.00));
}

#[tokio::test]
async fn scenario_2_repeated_transfer_id_is_idempotent() {
    let (engine, _pool) = engine().await;

    let a = engine.create_account(dec!(1000.00)).await.unwrap();
    let b = engine.create_account(dec!(500.00)).await.unwrap();
    let transfer_id = txid();

    engine.apply_transfer(&transfer_id, a.id, b.id, dec!(100.00)).await.unwrap();
    let second = engine.apply_transfer(&transfer_id, a.id, b.id, dec!(100.00)).await.unwrap();
    assert!(matches!(second, ApplyOutcome::AlreadyApplied));

    let a_after = engine.get_account(a.id).await.unwrap().unwrap();
    let b_after = engine.get_account(b.id).await.unwrap().unwrap();
    assert_eq!(a_after.balance, dec!(900.00));
    assert_eq!(b_after.balance, dec!(600.00));
}

#[tokio::test]
async fn scenario_3_insufficient_funds_leaves_balances_unchanged() {
    let (engine, _pool) = engine().await;

    let a = engine.create_account(dec!(100.00)).await.unwrap();
    let b = engine.create_account(dec!(0.01)).await.unwrap();

    let result = engine.apply_transfer(&txid(), a.id, b.id, dec!(150.00)).await;
    assert!(matches!(result, Err(AppError::InsufficientFunds { .. })));

    let a_after = engine.get_account(a.id).await.unwrap().unwrap();
    let b_after = engine.get_account(b.id).await.unwrap().unwrap();
    assert_eq!(a_after.balance, dec!(100.00));
    assert_eq!(b_after.balance, dec!(0.01));
}

#[tokio::test]
async fn insufficient_funds_by_one_minor_unit_is_rejected() {
    let (engine, _pool) = engine().await;

    let a = engine.create_account(dec!(100.00)).await.unwrap();
    let b = engine.create_account(dec!(1.00)).await.unwrap();

    let result = engine.apply_transfer(&txid(), a.id, b.id, dec!(100.01)).await;
    assert!(matches!(result, Err(AppError::InsufficientFunds { .. })));
}

#[tokio::test]
async fn self_transfer_is_rejected() {
    let (engine, _pool) = engine().await;
    let a = engine.create_account(dec!(100.00)).await.unwrap();

    let result = engine.apply_transfer(&txid(), a.id, a.id, dec!(10.00)).await;
    assert!(matches!(result, Err(AppError::InvalidRequest(_))));
}

#[tokio::test]
async fn zero_and_negative_amounts_are_rejected() {
    let (engine, _pool) = engine().await;
    let a = engine.create_account(dec!(100.00)).await.unwrap();
    let b = engine.create_account(dec!(100.00)).await.unwrap();

    assert!(matches!(
        engine.apply_transfer(&txid(), a.id, b.id, dec!(0)).await,
        Err(AppError::InvalidRequest(_))
    ));
    assert!(matches!(
        engine.apply_transfer(&txid(), a.id, b.id, dec!(-5)).await,
        Err(AppError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn unknown_account_is_rejected() {
    let (engine, _pool) = engine().await;
    let a = engine.create_account(dec!(100.00)).await.unwrap();

    let result = engine.apply_transfer(&txid(), a.id, 9_999_999, dec!(10.00)).await;
    assert!(matches!(result, Err(AppError::AccountNotFound(_))));
}

#[tokio::test]
async fn create_account_rejects_non_positive_initial_balance() {
    let (engine, _pool) = engine().await;
    assert!(matches!(engine.create_account(dec!(0)).await, Err(AppError::InvalidRequest(_))));
    assert!(matches!(engine.create_account(dec!(-1)).await, Err(AppError::InvalidRequest(_))));
}

#[tokio::test]
async fn scenario_4_concurrent_alternating_transfers_conserve_value_and_double_entry() {
    let (engine, pool) = engine().await;
    let a = engine.create_account(dec!(200.00)).await.unwrap();
    let b = engine.create_account(dec!(0.00)).await.unwrap();

    let engine = std::sync::Arc::new(engine);
    let mut handles = Vec::new();
    // §8 scenario 4 literally specifies 200 concurrent transfers.
    const N: usize = 200;

    for i in 0..N {
        let engine = engine.clone();
        let (from, to) = if i % 2 == 0 { (a.id, b.id) } else { (b.id, a.id) };
        handles.push(tokio::spawn(async move {
            engine.apply_transfer(&txid(), from, to, dec!(1.00)).await
        }));
    }

    let mut completed = 0;
    for handle in handles {
        let result = handle.await.unwrap();
        // Either side may momentarily lack funds depending on interleaving, but no
        // deadlock or unexpected error kind should ever surface.
        match result {
            Ok(_) => completed += 1,
            Err(AppError::InsufficientFunds { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert!(completed > 0);

    let a_after = engine.get_account(a.id).await.unwrap().unwrap();
    let b_after = engine.get_account(b.id).await.unwrap().unwrap();
    assert_eq!(a_after.balance + b_after.balance, dec!(200.00));
    assert!(a_after.balance >= Decimal::ZERO);
    assert!(b_after.balance >= Decimal::ZERO);

    // The scenario's "exactly 400 journal rows" assumes every one of the 200 transfers
    // commits, which requires every B→A transfer to observe a balance credited by some
    // prior A→B transfer. True concurrent scheduling gives no ordering guarantee between
    // the two (§5: "the commit order... is the order in which transactions acquire the
    // row's exclusive lock... no global transfer ordering"), so a B→A attempt racing
    // ahead of its funding A→B transfer is a legitimate InsufficientFunds rejection, not
    // a bug. We therefore assert the exact row count implied by however many of the N
    // transfers actually committed, rather than hard-coding 2*N.
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM journal_entries")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, (completed * 2) as i64, "every committed transfer must leave exactly one debit/credit pair");
}
