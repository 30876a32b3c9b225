//! Transaction primitives.
//!
//! A `Transaction` is a single income or expense, always linked to exactly
//! one category. Transactions are hard-deleted: nothing references them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CurrencyCode, EngineError, money::TRANSACTION_AMOUNT, store::VersionedEntity};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Expense,
    Income,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "EXPENSE",
            Self::Income => "INCOME",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EXPENSE" => Ok(Self::Expense),
            "INCOME" => Ok(Self::Income),
            other => Err(EngineError::Validation(format!(
                "invalid transaction type: {other}"
            ))),
        }
    }
}

/// Whether a transaction recurs with a fixed amount (rent, subscriptions) or
/// varies (groceries).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stability {
    Fixed,
    #[default]
    Variable,
}

impl Stability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "FIXED",
            Self::Variable => "VARIABLE",
        }
    }
}

impl TryFrom<&str> for Stability {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "FIXED" => Ok(Self::Fixed),
            "VARIABLE" => Ok(Self::Variable),
            other => Err(EngineError::Validation(format!(
                "invalid transaction stability: {other}"
            ))),
        }
    }
}

/// A transaction with its category resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub date: DateTime<Utc>,
    pub kind: TransactionKind,
    pub stability: Stability,
    pub category_id: Uuid,
    pub category_name: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new transaction.
///
/// `stability` defaults to [`Stability::Variable`]; a missing `category_id`
/// resolves to the default "Others" category.
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub date: DateTime<Utc>,
    pub kind: TransactionKind,
    pub stability: Option<Stability>,
    pub category_id: Option<Uuid>,
}

/// Partial update for a transaction. `None` keeps the stored value.
#[derive(Clone, Debug, Default)]
pub struct TransactionUpdate {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub kind: Option<TransactionKind>,
    pub stability: Option<Stability>,
    pub category_id: Option<Uuid>,
}

/// Aggregate over transactions of one type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub description: String,
    pub amount_minor: i64,
    pub currency: String,
    pub date: DateTimeUtc,
    pub kind: String,
    pub stability: String,
    pub category_id: Uuid,
    pub version: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Categories,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl VersionedEntity for Entity {
    const LABEL: &'static str = "transaction";

    fn id_column() -> Self::Column {
        Column::Id
    }

    fn version_column() -> Self::Column {
        Column::Version
    }

    fn updated_at_column() -> Self::Column {
        Column::UpdatedAt
    }
}

impl TryFrom<(Model, super::categories::Model)> for Transaction {
    type Error = EngineError;

    fn try_from(
        (model, category): (Model, super::categories::Model),
    ) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            description: model.description,
            amount: TRANSACTION_AMOUNT.from_minor(model.amount_minor),
            currency: CurrencyCode::try_from(model.currency.as_str())?,
            date: model.date,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            stability: Stability::try_from(model.stability.as_str())?,
            category_id: category.id,
            category_name: category.name,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
