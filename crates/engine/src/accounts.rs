//! The module contains `Account` and its storage model.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CurrencyCode, EngineError, store::VersionedEntity};

/// Kind of institution or asset an account tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountKind {
    Bank,
    Broker,
    Stock,
    P2p,
    Crypto,
    Other,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bank => "BANK",
            Self::Broker => "BROKER",
            Self::Stock => "STOCK",
            Self::P2p => "P2P",
            Self::Crypto => "CRYPTO",
            Self::Other => "OTHER",
        }
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "BANK" => Ok(Self::Bank),
            "BROKER" => Ok(Self::Broker),
            "STOCK" => Ok(Self::Stock),
            "P2P" => Ok(Self::P2p),
            "CRYPTO" => Ok(Self::Crypto),
            "OTHER" => Ok(Self::Other),
            other => Err(EngineError::Validation(format!(
                "invalid account type: {other}"
            ))),
        }
    }
}

/// An account.
///
/// A place where money or assets are held: a bank account, a broker, a
/// wallet. Its balance is never derived here; it is recorded over time as
/// [`Reading`](crate::Reading)s.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub kind: AccountKind,
    pub currency: CurrencyCode,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub(crate) fn new(
        name: String,
        kind: AccountKind,
        currency: CurrencyCode,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            kind,
            currency,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for an account. `None` keeps the stored value.
#[derive(Clone, Debug, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub kind: Option<AccountKind>,
    pub currency: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub currency: String,
    pub version: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::readings::Entity")]
    Readings,
}

impl Related<super::readings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Readings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl VersionedEntity for Entity {
    const LABEL: &'static str = "account";

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

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: ActiveValue::Set(account.id),
            name: ActiveValue::Set(account.name.clone()),
            kind: ActiveValue::Set(account.kind.as_str().to_string()),
            currency: ActiveValue::Set(account.currency.code().to_string()),
            version: ActiveValue::Set(account.version),
            created_at: ActiveValue::Set(account.created_at),
            updated_at: ActiveValue::Set(account.updated_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            name: model.name,
            kind: AccountKind::try_from(model.kind.as_str())?,
            currency: CurrencyCode::try_from(model.currency.as_str())?,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
