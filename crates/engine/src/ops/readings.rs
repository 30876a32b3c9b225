use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use sea_orm::{
    ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::{Alias, Expr, Order, Query},
};

use crate::{
    AccountReading, EngineError, Page, PageRequest, Reading, ReadingUpdate, ResultEngine,
    accounts, money::READING_AMOUNT, readings, store, util::ensure_not_future,
};

use super::{Engine, with_tx};

/// Number of non-deleted readings attached to an account.
pub(super) async fn count_active_readings<C: ConnectionTrait>(
    db: &C,
    account_id: Uuid,
) -> ResultEngine<u64> {
    readings::Entity::find()
        .filter(readings::Column::AccountId.eq(account_id))
        .filter(readings::Column::Deleted.eq(false))
        .count(db)
        .await
        .map_err(Into::into)
}

impl Engine {
    /// Records the balance of an account at `reading_date`.
    pub async fn create_reading(
        &self,
        account_id: Uuid,
        amount: Decimal,
        reading_date: DateTime<Utc>,
    ) -> ResultEngine<Reading> {
        let now = Utc::now();
        let amount_minor = READING_AMOUNT.to_minor(amount)?;
        ensure_not_future(reading_date, now, "reading date")?;
        with_tx!(self, |db_tx| {
            if !store::exists::<accounts::Entity, _>(&db_tx, account_id).await? {
                return Err(EngineError::NotFound(format!("account {account_id}")));
            }

            let model = store::insert(
                &db_tx,
                readings::ActiveModel::new_live(account_id, amount_minor, reading_date, now),
            )
            .await?;
            tracing::debug!(reading_id = %model.id, %account_id, "reading created");
            Ok(Reading::from(model))
        })
    }

    /// A live reading. Soft-deleted readings are reported as `NotFound`.
    pub async fn reading(&self, reading_id: Uuid) -> ResultEngine<Reading> {
        let model = store::get::<readings::Entity, _>(&self.database, reading_id).await?;
        Ok(Reading::from(model))
    }

    /// Applies a partial update to a live reading. The account link never
    /// changes.
    pub async fn update_reading(
        &self,
        reading_id: Uuid,
        version: i32,
        update: ReadingUpdate,
    ) -> ResultEngine<Reading> {
        let now = Utc::now();
        let mut changes = Vec::new();
        if let Some(amount) = update.amount {
            let amount_minor = READING_AMOUNT.to_minor(amount)?;
            changes.push((readings::Column::AmountMinor, Expr::value(amount_minor)));
        }
        if let Some(reading_date) = update.reading_date {
            ensure_not_future(reading_date, now, "reading date")?;
            changes.push((readings::Column::ReadingDate, Expr::value(reading_date)));
        }

        with_tx!(self, |db_tx| {
            store::compare_and_swap::<readings::Entity, _>(
                &db_tx, reading_id, version, changes, now,
            )
            .await?;
            let model = store::get::<readings::Entity, _>(&db_tx, reading_id).await?;
            Ok(Reading::from(model))
        })
    }

    /// Soft-deletes a reading.
    ///
    /// The tombstone is terminal: afterwards the reading is invisible to every
    /// query and cannot be updated or deleted again.
    pub async fn delete_reading(&self, reading_id: Uuid) -> ResultEngine<()> {
        store::update_unversioned::<readings::Entity, _>(
            &self.database,
            reading_id,
            vec![(readings::Column::Deleted, Expr::value(true))],
            Utc::now(),
        )
        .await
    }

    /// The most recent live reading of every account that has one.
    ///
    /// "Most recent" is the greatest `reading_date`; ties go to the greatest
    /// reading id. Ordered by account name, then account id.
    pub async fn latest_readings(&self) -> ResultEngine<Vec<AccountReading>> {
        let newer = Alias::new("newer");
        let latest_id = Query::select()
            .column((newer.clone(), readings::Column::Id))
            .from_as(readings::Entity, newer.clone())
            .and_where(
                Expr::col((newer.clone(), readings::Column::AccountId))
                    .equals((readings::Entity, readings::Column::AccountId)),
            )
            .and_where(Expr::col((newer.clone(), readings::Column::Deleted)).eq(false))
            .order_by((newer.clone(), readings::Column::ReadingDate), Order::Desc)
            .order_by((newer, readings::Column::Id), Order::Desc)
            .limit(1)
            .to_owned();

        let rows = readings::Entity::find()
            .filter(readings::Column::Deleted.eq(false))
            .filter(readings::Column::Id.in_subquery(latest_id))
            .find_also_related(accounts::Entity)
            .order_by_asc(accounts::Column::Name)
            .order_by_asc(accounts::Column::Id)
            .all(&self.database)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(reading, account)| {
                account.map(|account| AccountReading {
                    account_name: account.name,
                    reading: Reading::from(reading),
                })
            })
            .collect())
    }

    /// Live readings of one account, newest first.
    pub async fn account_reading_history(
        &self,
        account_id: Uuid,
        page: PageRequest,
    ) -> ResultEngine<Page<Reading>> {
        let page = page.validate()?;
        with_tx!(self, |db_tx| {
            if !store::exists::<accounts::Entity, _>(&db_tx, account_id).await? {
                return Err(EngineError::NotFound(format!("account {account_id}")));
            }

            let paginator = readings::Entity::find()
                .filter(readings::Column::AccountId.eq(account_id))
                .filter(readings::Column::Deleted.eq(false))
                .order_by_desc(readings::Column::ReadingDate)
                .order_by_desc(readings::Column::Id)
                .paginate(&db_tx, page.size);
            let total = paginator.num_items().await?;
            let items = paginator.fetch_page(page.page).await?;

            Ok(Page::new(
                items.into_iter().map(Reading::from).collect(),
                page,
                total,
            ))
        })
    }

    /// Number of live readings attached to an account.
    pub async fn count_active_readings(&self, account_id: Uuid) -> ResultEngine<u64> {
        count_active_readings(&self.database, account_id).await
    }
}
