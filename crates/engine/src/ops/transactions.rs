use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    ActiveValue, ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    CurrencyCode, EngineError, NewTransaction, Page, PageRequest, ResultEngine, Stability,
    Summary, Transaction, TransactionKind, TransactionUpdate, categories,
    money::TRANSACTION_AMOUNT,
    store, transactions,
    util::{MAX_DESCRIPTION_LEN, ensure_not_future, normalize_required_text},
};

use super::{
    Engine,
    categories::{DEFAULT_CATEGORY_NAME, find_category_by_name},
    with_tx,
};

/// Filters for listing transactions. Both are optional and combine with AND.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub category_id: Option<Uuid>,
    pub stability: Option<Stability>,
}

fn join_category(
    (model, category): (transactions::Model, Option<categories::Model>),
) -> ResultEngine<Transaction> {
    let category = category.ok_or_else(|| {
        EngineError::NotFound(format!("category {}", model.category_id))
    })?;
    Transaction::try_from((model, category))
}

async fn load_transaction<C: ConnectionTrait>(
    db: &C,
    transaction_id: Uuid,
) -> ResultEngine<Transaction> {
    let row = transactions::Entity::find_by_id(transaction_id)
        .find_also_related(categories::Entity)
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("transaction {transaction_id}")))?;
    join_category(row)
}

impl Engine {
    /// Explicit category, or the default one when `category_id` is `None`.
    ///
    /// A missing default category means seeding never ran: that is reported as
    /// `FatalConfiguration`, not as a client error.
    async fn resolve_category<C: ConnectionTrait>(
        &self,
        db: &C,
        category_id: Option<Uuid>,
    ) -> ResultEngine<categories::Model> {
        if let Some(id) = category_id {
            return store::get::<categories::Entity, _>(db, id).await;
        }

        match find_category_by_name(db, DEFAULT_CATEGORY_NAME).await? {
            Some(model) => Ok(model),
            None => {
                tracing::error!(
                    "default category '{DEFAULT_CATEGORY_NAME}' is missing; were categories seeded?"
                );
                Err(EngineError::FatalConfiguration(format!(
                    "default category '{DEFAULT_CATEGORY_NAME}' not found"
                )))
            }
        }
    }

    /// Records an income or expense.
    ///
    /// Nothing is written unless the category resolves.
    pub async fn create_transaction(&self, input: NewTransaction) -> ResultEngine<Transaction> {
        let now = Utc::now();
        let description =
            normalize_required_text(&input.description, "description", MAX_DESCRIPTION_LEN)?;
        let amount_minor = TRANSACTION_AMOUNT.to_positive_minor(input.amount)?;
        let currency = CurrencyCode::try_from(input.currency.as_str())?;
        ensure_not_future(input.date, now, "date")?;
        let stability = input.stability.unwrap_or_default();

        with_tx!(self, |db_tx| {
            let category = self.resolve_category(&db_tx, input.category_id).await?;

            let active = transactions::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                description: ActiveValue::Set(description),
                amount_minor: ActiveValue::Set(amount_minor),
                currency: ActiveValue::Set(currency.code().to_string()),
                date: ActiveValue::Set(input.date),
                kind: ActiveValue::Set(input.kind.as_str().to_string()),
                stability: ActiveValue::Set(stability.as_str().to_string()),
                category_id: ActiveValue::Set(category.id),
                version: ActiveValue::Set(0),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
            };
            let model = store::insert(&db_tx, active).await?;
            tracing::debug!(
                transaction_id = %model.id,
                category = %category.name,
                "transaction created"
            );
            Transaction::try_from((model, category))
        })
    }

    /// One page of transactions, newest first.
    ///
    /// A `category_id` filter must name an existing category.
    pub async fn transactions(
        &self,
        filter: &TransactionListFilter,
        page: PageRequest,
    ) -> ResultEngine<Page<Transaction>> {
        let page = page.validate()?;
        with_tx!(self, |db_tx| {
            let mut query = transactions::Entity::find();
            if let Some(category_id) = filter.category_id {
                if !store::exists::<categories::Entity, _>(&db_tx, category_id).await? {
                    return Err(EngineError::NotFound(format!("category {category_id}")));
                }
                query = query.filter(transactions::Column::CategoryId.eq(category_id));
            }
            if let Some(stability) = filter.stability {
                query = query.filter(transactions::Column::Stability.eq(stability.as_str()));
            }

            let paginator = query
                .find_also_related(categories::Entity)
                .order_by_desc(transactions::Column::Date)
                .order_by_desc(transactions::Column::Id)
                .paginate(&db_tx, page.size);
            let total = paginator.num_items().await?;
            let items = paginator
                .fetch_page(page.page)
                .await?
                .into_iter()
                .map(join_category)
                .collect::<ResultEngine<Vec<_>>>()?;

            Ok(Page::new(items, page, total))
        })
    }

    pub async fn transaction(&self, transaction_id: Uuid) -> ResultEngine<Transaction> {
        load_transaction(&self.database, transaction_id).await
    }

    /// Applies a partial update, keeping every field left as `None`.
    ///
    /// A new `category_id` must resolve; it replaces the current category.
    pub async fn update_transaction(
        &self,
        transaction_id: Uuid,
        version: i32,
        update: TransactionUpdate,
    ) -> ResultEngine<Transaction> {
        let now = Utc::now();
        let mut changes = Vec::new();
        if let Some(description) = update.description.as_deref() {
            let description =
                normalize_required_text(description, "description", MAX_DESCRIPTION_LEN)?;
            changes.push((transactions::Column::Description, Expr::value(description)));
        }
        if let Some(amount) = update.amount {
            let amount_minor = TRANSACTION_AMOUNT.to_positive_minor(amount)?;
            changes.push((transactions::Column::AmountMinor, Expr::value(amount_minor)));
        }
        if let Some(currency) = update.currency.as_deref() {
            let currency = CurrencyCode::try_from(currency)?;
            changes.push((
                transactions::Column::Currency,
                Expr::value(currency.code().to_string()),
            ));
        }
        if let Some(date) = update.date {
            ensure_not_future(date, now, "date")?;
            changes.push((transactions::Column::Date, Expr::value(date)));
        }
        if let Some(kind) = update.kind {
            changes.push((transactions::Column::Kind, Expr::value(kind.as_str())));
        }
        if let Some(stability) = update.stability {
            changes.push((transactions::Column::Stability, Expr::value(stability.as_str())));
        }

        with_tx!(self, |db_tx| {
            store::get::<transactions::Entity, _>(&db_tx, transaction_id).await?;

            if let Some(category_id) = update.category_id {
                let category = self.resolve_category(&db_tx, Some(category_id)).await?;
                changes.push((transactions::Column::CategoryId, Expr::value(category.id)));
            }

            store::compare_and_swap::<transactions::Entity, _>(
                &db_tx,
                transaction_id,
                version,
                changes,
                now,
            )
            .await?;
            load_transaction(&db_tx, transaction_id).await
        })
    }

    /// Permanently removes a transaction.
    pub async fn delete_transaction(&self, transaction_id: Uuid) -> ResultEngine<()> {
        store::delete::<transactions::Entity, _>(&self.database, transaction_id).await
    }

    /// Sum of the amounts of every transaction of `kind`; zero when there are
    /// none.
    pub async fn sum_by_type(&self, kind: TransactionKind) -> ResultEngine<Summary> {
        let total: Option<Option<i64>> = transactions::Entity::find()
            .select_only()
            .column_as(Expr::col(transactions::Column::AmountMinor).sum(), "total")
            .filter(transactions::Column::Kind.eq(kind.as_str()))
            .into_tuple()
            .one(&self.database)
            .await?;
        let total_minor = total.flatten().unwrap_or(0);
        Ok(Summary {
            total: TRANSACTION_AMOUNT.from_minor(total_minor),
        })
    }

    pub async fn expense_total(&self) -> ResultEngine<Summary> {
        self.sum_by_type(TransactionKind::Expense).await
    }

    pub async fn income_total(&self) -> ResultEngine<Summary> {
        self.sum_by_type(TransactionKind::Income).await
    }
}
