//! Balance readings.
//!
//! A [`Reading`] records the balance of one account at a point in time. The
//! account link is fixed at creation.
//!
//! Readings are never physically removed: `delete` sets the `deleted`
//! tombstone, which is terminal. Every read path filters tombstoned rows out,
//! so a deleted reading behaves like a missing one.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, Condition, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{money::READING_AMOUNT, store::VersionedEntity};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Signed: negative balances model margin or debt.
    pub amount: Decimal,
    pub reading_date: DateTime<Utc>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reading together with the name of its account.
///
/// Returned by the "latest per account" query, which is ordered by account
/// name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountReading {
    pub account_name: String,
    pub reading: Reading,
}

/// Partial update for a reading. `None` keeps the stored value.
///
/// The owning account cannot change.
#[derive(Clone, Debug, Default)]
pub struct ReadingUpdate {
    pub amount: Option<Decimal>,
    pub reading_date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "readings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub amount_minor: i64,
    pub reading_date: DateTimeUtc,
    pub deleted: bool,
    pub version: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl VersionedEntity for Entity {
    const LABEL: &'static str = "reading";

    fn id_column() -> Self::Column {
        Column::Id
    }

    fn version_column() -> Self::Column {
        Column::Version
    }

    fn updated_at_column() -> Self::Column {
        Column::UpdatedAt
    }

    fn live_condition() -> Condition {
        Condition::all().add(Column::Deleted.eq(false))
    }
}

impl From<Model> for Reading {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            amount: READING_AMOUNT.from_minor(model.amount_minor),
            reading_date: model.reading_date,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl ActiveModel {
    /// A fresh, live reading at version 0.
    pub(crate) fn new_live(
        account_id: Uuid,
        amount_minor: i64,
        reading_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ActiveValue::Set(Uuid::new_v4()),
            account_id: ActiveValue::Set(account_id),
            amount_minor: ActiveValue::Set(amount_minor),
            reading_date: ActiveValue::Set(reading_date),
            deleted: ActiveValue::Set(false),
            version: ActiveValue::Set(0),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        }
    }
}
