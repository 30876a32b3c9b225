use std::time::Duration;

use chrono::{TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    ACCOUNT_LIMIT, AccountKind, AccountUpdate, Decimal, Engine, EngineError, PageRequest,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

#[tokio::test]
async fn new_account_starts_at_version_zero() {
    let (engine, _db) = engine_with_db().await;

    let account = engine
        .create_account("  Main bank ", AccountKind::Bank, "eur")
        .await
        .unwrap();

    assert_eq!(account.name, "Main bank");
    assert_eq!(account.currency.code(), "EUR");
    assert_eq!(account.version, 0);
    assert_eq!(account.created_at, account.updated_at);

    let stored = engine.account(account.id).await.unwrap();
    assert_eq!(stored, account);
}

#[tokio::test]
async fn create_account_rejects_invalid_input() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .create_account("   ", AccountKind::Bank, "EUR")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_account("Broker", AccountKind::Broker, "EURO")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let long_name = "x".repeat(101);
    let err = engine
        .create_account(&long_name, AccountKind::Other, "USD")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    assert!(engine.list_accounts().await.unwrap().is_empty());
}

#[tokio::test]
async fn update_increments_version_and_touches_updated_at() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("Savings", AccountKind::Bank, "EUR")
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;

    let updated = engine
        .update_account(
            account.id,
            account.version,
            AccountUpdate {
                name: Some("Savings (joint)".to_string()),
                kind: Some(AccountKind::Broker),
                currency: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.version, 1);
    assert_eq!(updated.name, "Savings (joint)");
    assert_eq!(updated.kind, AccountKind::Broker);
    assert_eq!(updated.currency.code(), "EUR");
    assert_eq!(updated.created_at, account.created_at);
    assert!(updated.updated_at > account.updated_at);
}

#[tokio::test]
async fn stale_version_is_rejected_without_writing() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("Crypto", AccountKind::Crypto, "USD")
        .await
        .unwrap();

    engine
        .update_account(
            account.id,
            0,
            AccountUpdate {
                name: Some("Cold wallet".to_string()),
                ..AccountUpdate::default()
            },
        )
        .await
        .unwrap();

    let err = engine
        .update_account(
            account.id,
            0,
            AccountUpdate {
                name: Some("Hot wallet".to_string()),
                ..AccountUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::VersionConflict("account".to_string()));
    assert!(err.is_retryable());

    let stored = engine.account(account.id).await.unwrap();
    assert_eq!(stored.name, "Cold wallet");
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn update_of_missing_account_is_not_found() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .update_account(Uuid::new_v4(), 0, AccountUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn concurrent_updates_with_same_version_let_one_win() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account("Shared", AccountKind::Bank, "EUR")
        .await
        .unwrap();

    let first = engine.clone();
    let second = engine.clone();
    let (a, b) = tokio::join!(
        first.update_account(
            account.id,
            0,
            AccountUpdate {
                name: Some("Left".to_string()),
                ..AccountUpdate::default()
            },
        ),
        second.update_account(
            account.id,
            0,
            AccountUpdate {
                name: Some("Right".to_string()),
                ..AccountUpdate::default()
            },
        ),
    );

    let results = [a, b];
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(EngineError::VersionConflict(_))))
        .count();
    assert_eq!(ok, 1);
    assert_eq!(conflicts, 1);

    let stored = engine.account(account.id).await.unwrap();
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn account_limit_is_enforced() {
    let (engine, _db) = engine_with_db().await;

    for i in 0..ACCOUNT_LIMIT {
        engine
            .create_account(&format!("Account {i}"), AccountKind::Other, "EUR")
            .await
            .unwrap();
    }

    let err = engine
        .create_account("One too many", AccountKind::Other, "EUR")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::LimitExceeded(_)));
    assert_eq!(engine.list_accounts().await.unwrap().len() as u64, ACCOUNT_LIMIT);
}

#[tokio::test]
async fn list_accounts_is_ordered_by_name() {
    let (engine, _db) = engine_with_db().await;
    for name in ["Zeta", "Alpha", "Mid"] {
        engine
            .create_account(name, AccountKind::Bank, "EUR")
            .await
            .unwrap();
    }

    let names: Vec<_> = engine
        .list_accounts()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, ["Alpha", "Mid", "Zeta"]);
}

#[tokio::test]
async fn delete_is_blocked_by_active_readings_only() {
    let (engine, db) = engine_with_db().await;
    let account = engine
        .create_account("Broker", AccountKind::Broker, "USD")
        .await
        .unwrap();

    let day = |d| Utc.with_ymd_and_hms(2024, 3, d, 9, 0, 0).unwrap();
    let first = engine
        .create_reading(account.id, Decimal::new(100_000, 2), day(1))
        .await
        .unwrap();
    let second = engine
        .create_reading(account.id, Decimal::new(120_000, 2), day(2))
        .await
        .unwrap();

    let err = engine.delete_account(account.id).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InUse {
            entity: format!("account {}", account.id),
            count: 2,
        }
    );

    engine.delete_reading(first.id).await.unwrap();
    engine.delete_reading(second.id).await.unwrap();
    assert_eq!(engine.count_active_readings(account.id).await.unwrap(), 0);

    engine.delete_account(account.id).await.unwrap();

    let err = engine.account(account.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    let err = engine
        .account_reading_history(account.id, PageRequest::readings())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    // Tombstones of the deleted account go with it.
    let row = db
        .query_one(Statement::from_sql_and_values(
            db.get_database_backend(),
            "SELECT COUNT(*) AS n FROM readings WHERE account_id = ?",
            vec![account.id.into()],
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.try_get::<i64>("", "n").unwrap(), 0);
}

#[tokio::test]
async fn delete_of_missing_account_is_not_found() {
    let (engine, _db) = engine_with_db().await;

    let err = engine.delete_account(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}
