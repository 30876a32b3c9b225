use chrono::{TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{
    DEFAULT_CATEGORY_NAME, Decimal, Engine, EngineError, NewTransaction, PREDEFINED_CATEGORIES,
    PageRequest, TransactionKind,
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

fn purchase(category_id: Uuid) -> NewTransaction {
    NewTransaction {
        description: "Flight".to_string(),
        amount: Decimal::new(19_900, 2),
        currency: "EUR".to_string(),
        date: Utc.with_ymd_and_hms(2024, 2, 10, 7, 0, 0).unwrap(),
        kind: TransactionKind::Expense,
        stability: None,
        category_id: Some(category_id),
    }
}

#[tokio::test]
async fn seeding_runs_once() {
    let (engine, _db) = engine_with_db().await;

    let created = engine.seed_predefined_categories().await.unwrap();
    assert_eq!(created, PREDEFINED_CATEGORIES.len() as u64);

    let again = engine.seed_predefined_categories().await.unwrap();
    assert_eq!(again, 0);

    let all = engine.list_all_categories().await.unwrap();
    assert_eq!(all.len(), PREDEFINED_CATEGORIES.len());
    assert!(all.iter().all(|c| c.is_predefined));
    assert!(all.iter().any(|c| c.name == DEFAULT_CATEGORY_NAME));
}

#[tokio::test]
async fn seeding_skips_names_already_taken() {
    let (engine, _db) = engine_with_db().await;
    let custom = engine.create_category("sport").await.unwrap();
    assert!(!custom.is_predefined);

    let created = engine.seed_predefined_categories().await.unwrap();
    assert_eq!(created, PREDEFINED_CATEGORIES.len() as u64 - 1);

    let stored = engine.category(custom.id).await.unwrap();
    assert_eq!(stored.name, "sport");
    assert!(!stored.is_predefined);
}

#[tokio::test]
async fn names_are_unique_ignoring_case() {
    let (engine, _db) = engine_with_db().await;
    engine.seed_predefined_categories().await.unwrap();

    let err = engine.create_category("  food & DRINKS ").await.unwrap_err();
    assert_eq!(err, EngineError::NameConflict("food & DRINKS".to_string()));

    let err = engine.create_category("").await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn rename_checks_conflicts_except_self() {
    let (engine, _db) = engine_with_db().await;
    let travel = engine.create_category("Travel").await.unwrap();
    engine.create_category("Books").await.unwrap();

    let renamed = engine
        .update_category(travel.id, "TRAVEL", travel.version)
        .await
        .unwrap();
    assert_eq!(renamed.name, "TRAVEL");
    assert_eq!(renamed.version, 1);
    assert!(!renamed.is_predefined);

    let err = engine
        .update_category(travel.id, "books", renamed.version)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NameConflict(_)));

    let err = engine
        .update_category(travel.id, "Trips", 0)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::VersionConflict("category".to_string()));

    let err = engine
        .update_category(Uuid::new_v4(), "Ghost", 0)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn delete_is_blocked_while_transactions_reference_it() {
    let (engine, _db) = engine_with_db().await;
    engine.seed_predefined_categories().await.unwrap();
    let travel = engine.create_category("Travel").await.unwrap();
    let tx = engine.create_transaction(purchase(travel.id)).await.unwrap();

    let err = engine.delete_category(travel.id).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InUse {
            entity: "category 'Travel'".to_string(),
            count: 1,
        }
    );
    assert_eq!(engine.count_linked_transactions(travel.id).await.unwrap(), 1);

    engine.delete_transaction(tx.id).await.unwrap();
    engine.delete_category(travel.id).await.unwrap();

    assert!(matches!(
        engine.category(travel.id).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
}

#[tokio::test]
async fn default_category_cannot_be_deleted() {
    let (engine, _db) = engine_with_db().await;
    engine.seed_predefined_categories().await.unwrap();
    let others = engine
        .list_all_categories()
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.name == DEFAULT_CATEGORY_NAME)
        .unwrap();

    let err = engine.delete_category(others.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(engine.category(others.id).await.is_ok());
}

#[tokio::test]
async fn categories_are_paged_by_name() {
    let (engine, _db) = engine_with_db().await;
    engine.seed_predefined_categories().await.unwrap();

    let first = engine.categories(PageRequest::new(0, 10)).await.unwrap();
    assert_eq!(first.total_items, 15);
    assert_eq!(first.total_pages, 2);
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.items[0].name, "ATM");

    let second = engine.categories(PageRequest::new(1, 10)).await.unwrap();
    assert_eq!(second.items.len(), 5);
    assert_eq!(second.items[4].name, "Video & Films");

    let err = engine.categories(PageRequest::new(0, 0)).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn rename_keeps_created_at_and_advances_updated_at() {
    let (engine, _db) = engine_with_db().await;
    let travel = engine.create_category("Travel").await.unwrap();
    assert_eq!(travel.version, 0);
    assert_eq!(travel.created_at, travel.updated_at);

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let renamed = engine
        .update_category(travel.id, "Trips", travel.version)
        .await
        .unwrap();
    assert_eq!(renamed.created_at, travel.created_at);
    assert!(renamed.updated_at > travel.updated_at);
}

#[tokio::test]
async fn concurrent_renames_with_same_version_let_one_win() {
    let (engine, _db) = engine_with_db().await;
    let travel = engine.create_category("Travel").await.unwrap();

    let first = engine.clone();
    let second = engine.clone();
    let (a, b) = tokio::join!(
        first.update_category(travel.id, "Trips", 0),
        second.update_category(travel.id, "Journeys", 0),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(EngineError::VersionConflict(_))))
            .count(),
        1
    );
    assert_eq!(engine.category(travel.id).await.unwrap().version, 1);
}
