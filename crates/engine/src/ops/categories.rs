use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    ConnectionTrait, DbErr, PaginatorTrait, QueryFilter, QueryOrder, SqlErr, TransactionTrait,
    prelude::*, sea_query::Expr,
};

use crate::{
    Category, EngineError, Page, PageRequest, ResultEngine, categories, store, transactions,
    util::{MAX_NAME_LEN, name_key, normalize_required_text},
};

use super::{Engine, with_tx};

/// Category every transaction without an explicit category is attached to.
///
/// Its presence is also the marker that seeding already ran.
pub const DEFAULT_CATEGORY_NAME: &str = "Others";

/// Categories created on first start, in creation order.
pub const PREDEFINED_CATEGORIES: [&str; 15] = [
    "Office Renting",
    "Public Transport",
    "Bank",
    "Car Maintenance",
    "Food & Drinks",
    "Subscriptions",
    "Supermarket",
    "Tolls",
    "Gas",
    "Sport",
    "Gifts",
    "ATM",
    "Video & Films",
    "Transfers",
    DEFAULT_CATEGORY_NAME,
];

/// Case-insensitive lookup by name.
pub(super) async fn find_category_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> ResultEngine<Option<categories::Model>> {
    categories::Entity::find()
        .filter(categories::Column::NameNorm.eq(name_key(name)))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Number of transactions referencing a category.
pub(super) async fn count_linked_transactions<C: ConnectionTrait>(
    db: &C,
    category_id: Uuid,
) -> ResultEngine<u64> {
    transactions::Entity::find()
        .filter(transactions::Column::CategoryId.eq(category_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// The unique index on `name_norm` backs up the explicit duplicate check when
/// two writers race on the same name.
fn map_name_conflict(err: DbErr, name: &str) -> EngineError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => EngineError::NameConflict(name.to_string()),
        _ => EngineError::Database(err),
    }
}

impl Engine {
    /// Creates a custom (non-predefined) category.
    pub async fn create_category(&self, name: &str) -> ResultEngine<Category> {
        let name = normalize_required_text(name, "category name", MAX_NAME_LEN)?;
        with_tx!(self, |db_tx| {
            if find_category_by_name(&db_tx, &name).await?.is_some() {
                return Err(EngineError::NameConflict(name));
            }

            let category = Category::new(name, false, Utc::now());
            store::insert(&db_tx, categories::ActiveModel::from(&category))
                .await
                .map_err(|err| match err {
                    EngineError::Database(db_err) => map_name_conflict(db_err, &category.name),
                    other => other,
                })?;
            tracing::debug!(category_id = %category.id, "category created");
            Ok(category)
        })
    }

    /// Creates the predefined categories unless the default category already
    /// exists.
    ///
    /// Meant to run once at startup, before any transaction is created.
    /// Names already taken by a custom category are left alone. Returns how
    /// many categories were created.
    pub async fn seed_predefined_categories(&self) -> ResultEngine<u64> {
        with_tx!(self, |db_tx| {
            if find_category_by_name(&db_tx, DEFAULT_CATEGORY_NAME)
                .await?
                .is_some()
            {
                tracing::info!("categories already seeded, skipping");
                return Ok(0);
            }

            let now = Utc::now();
            let mut created = 0_u64;
            for name in PREDEFINED_CATEGORIES {
                if find_category_by_name(&db_tx, name).await?.is_some() {
                    tracing::info!(name, "predefined category name already in use, skipping");
                    continue;
                }
                let category = Category::new(name.to_string(), true, now);
                store::insert(&db_tx, categories::ActiveModel::from(&category)).await?;
                created += 1;
            }

            tracing::info!(created, "seeded predefined categories");
            Ok(created)
        })
    }

    /// One page of categories ordered by name, then id.
    pub async fn categories(&self, page: PageRequest) -> ResultEngine<Page<Category>> {
        let page = page.validate()?;
        let paginator = categories::Entity::find()
            .order_by_asc(categories::Column::Name)
            .order_by_asc(categories::Column::Id)
            .paginate(&self.database, page.size);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.page).await?;
        Ok(Page::new(
            items.into_iter().map(Category::from).collect(),
            page,
            total,
        ))
    }

    /// Every category ordered by name, then id.
    pub async fn list_all_categories(&self) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .order_by_asc(categories::Column::Name)
            .order_by_asc(categories::Column::Id)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Category::from).collect())
    }

    pub async fn category(&self, category_id: Uuid) -> ResultEngine<Category> {
        let model = store::get::<categories::Entity, _>(&self.database, category_id).await?;
        Ok(Category::from(model))
    }

    /// Renames a category.
    ///
    /// Renaming to the current name (in any casing) is not a conflict.
    /// Predefined categories keep their flag.
    pub async fn update_category(
        &self,
        category_id: Uuid,
        name: &str,
        version: i32,
    ) -> ResultEngine<Category> {
        let name = normalize_required_text(name, "category name", MAX_NAME_LEN)?;
        with_tx!(self, |db_tx| {
            store::get::<categories::Entity, _>(&db_tx, category_id).await?;

            if let Some(existing) = find_category_by_name(&db_tx, &name).await?
                && existing.id != category_id
            {
                return Err(EngineError::NameConflict(name));
            }

            let changes = vec![
                (categories::Column::NameNorm, Expr::value(name_key(&name))),
                (categories::Column::Name, Expr::value(name.clone())),
            ];
            store::compare_and_swap::<categories::Entity, _>(
                &db_tx,
                category_id,
                version,
                changes,
                Utc::now(),
            )
            .await
            .map_err(|err| match err {
                EngineError::Database(db_err) => map_name_conflict(db_err, &name),
                other => other,
            })?;

            let model = store::get::<categories::Entity, _>(&db_tx, category_id).await?;
            Ok(Category::from(model))
        })
    }

    /// Deletes a category no transaction references.
    ///
    /// The default category is never deleted: transactions created without a
    /// category depend on it.
    pub async fn delete_category(&self, category_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = store::get::<categories::Entity, _>(&db_tx, category_id).await?;

            let linked = count_linked_transactions(&db_tx, category_id).await?;
            if linked > 0 {
                return Err(EngineError::InUse {
                    entity: format!("category '{}'", model.name),
                    count: linked,
                });
            }

            if model.name_norm == name_key(DEFAULT_CATEGORY_NAME) {
                return Err(EngineError::Validation(format!(
                    "the default category '{DEFAULT_CATEGORY_NAME}' cannot be deleted"
                )));
            }

            store::delete::<categories::Entity, _>(&db_tx, category_id).await
        })
    }

    /// Number of transactions referencing a category.
    pub async fn count_linked_transactions(&self, category_id: Uuid) -> ResultEngine<u64> {
        count_linked_transactions(&self.database, category_id).await
    }
}
