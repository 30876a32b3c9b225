//! Category registry entity.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{store::VersionedEntity, util::name_key};

/// A transaction category.
///
/// Predefined categories are created by the startup seeder; custom ones by
/// users. The flag is fixed at creation, renaming never changes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub is_predefined: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub(crate) fn new(name: String, is_predefined: bool, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            is_predefined,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub name_norm: String,
    pub is_predefined: bool,
    pub version: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl VersionedEntity for Entity {
    const LABEL: &'static str = "category";

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

impl From<&Category> for ActiveModel {
    fn from(category: &Category) -> Self {
        Self {
            id: ActiveValue::Set(category.id),
            name: ActiveValue::Set(category.name.clone()),
            name_norm: ActiveValue::Set(name_key(&category.name)),
            is_predefined: ActiveValue::Set(category.is_predefined),
            version: ActiveValue::Set(category.version),
            created_at: ActiveValue::Set(category.created_at),
            updated_at: ActiveValue::Set(category.updated_at),
        }
    }
}

impl From<Model> for Category {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            is_predefined: model.is_predefined,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
