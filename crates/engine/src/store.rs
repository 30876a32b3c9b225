//! Versioned entity store.
//!
//! Every entity carries a `version` counter and an `updated_at` stamp. The
//! functions here are the only way registries read and write rows, so the
//! optimistic-locking rules live in one place:
//!
//! - inserts start at version 0;
//! - updates go through [`compare_and_swap`], a single conditional `UPDATE`
//!   that matches on `(id, version)` and bumps the version in the same
//!   statement. Two writers presenting the same version cannot both match;
//! - [`VersionedEntity::live_condition`] is applied on every read, which is
//!   how tombstoned readings disappear.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, Condition, ConnectionTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter,
    prelude::*,
    sea_query::{Expr, SimpleExpr},
};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// An entity stored with an optimistic-lock version.
pub(crate) trait VersionedEntity: EntityTrait {
    /// Human readable name used in errors and logs.
    const LABEL: &'static str;

    fn id_column() -> Self::Column;
    fn version_column() -> Self::Column;
    fn updated_at_column() -> Self::Column;

    /// Predicate every visible row satisfies.
    fn live_condition() -> Condition {
        Condition::all()
    }
}

fn not_found<E: VersionedEntity>(id: Uuid) -> EngineError {
    EngineError::NotFound(format!("{} {id}", E::LABEL))
}

/// Load a visible row by id.
pub(crate) async fn get<E, C>(db: &C, id: Uuid) -> ResultEngine<E::Model>
where
    E: VersionedEntity,
    C: ConnectionTrait,
{
    E::find()
        .filter(E::id_column().eq(id))
        .filter(E::live_condition())
        .one(db)
        .await?
        .ok_or_else(|| not_found::<E>(id))
}

pub(crate) async fn exists<E, C>(db: &C, id: Uuid) -> ResultEngine<bool>
where
    E: VersionedEntity,
    E::Model: Sync,
    C: ConnectionTrait,
{
    let count = E::find()
        .filter(E::id_column().eq(id))
        .filter(E::live_condition())
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Number of visible rows.
pub(crate) async fn count<E, C>(db: &C) -> ResultEngine<u64>
where
    E: VersionedEntity,
    E::Model: Sync,
    C: ConnectionTrait,
{
    E::find()
        .filter(E::live_condition())
        .count(db)
        .await
        .map_err(Into::into)
}

/// Persist a new row. Callers build the active model at version 0.
pub(crate) async fn insert<A, C>(db: &C, model: A) -> ResultEngine<<A::Entity as EntityTrait>::Model>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    let inserted = model.insert(db).await?;
    Ok(inserted)
}

/// Physically remove a row.
pub(crate) async fn delete<E, C>(db: &C, id: Uuid) -> ResultEngine<()>
where
    E: VersionedEntity,
    C: ConnectionTrait,
{
    let result = E::delete_many()
        .filter(E::id_column().eq(id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(not_found::<E>(id));
    }
    tracing::debug!(entity = E::LABEL, %id, "deleted");
    Ok(())
}

/// Apply `changes` to row `id` only if its stored version equals `expected`.
///
/// The version is incremented and `updated_at` set to `now` in the same
/// statement. Returns the new version.
///
/// When nothing matched, the row is looked up once more to tell a missing
/// (or tombstoned) row from a stale version; either way nothing was written.
pub(crate) async fn compare_and_swap<E, C>(
    db: &C,
    id: Uuid,
    expected: i32,
    changes: Vec<(E::Column, SimpleExpr)>,
    now: DateTime<Utc>,
) -> ResultEngine<i32>
where
    E: VersionedEntity,
    E::Model: Sync,
    C: ConnectionTrait,
{
    let mut update = E::update_many()
        .col_expr(E::version_column(), Expr::col(E::version_column()).add(1))
        .col_expr(E::updated_at_column(), Expr::value(now));
    for (column, value) in changes {
        update = update.col_expr(column, value);
    }

    let result = update
        .filter(E::id_column().eq(id))
        .filter(E::version_column().eq(expected))
        .filter(E::live_condition())
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        if exists::<E, C>(db, id).await? {
            tracing::warn!(entity = E::LABEL, %id, expected, "version conflict");
            return Err(EngineError::VersionConflict(E::LABEL.to_string()));
        }
        return Err(not_found::<E>(id));
    }

    let version = expected + 1;
    tracing::debug!(entity = E::LABEL, %id, version, "updated");
    Ok(version)
}

/// Apply `changes` to a visible row regardless of its version, still bumping
/// the version and `updated_at`.
///
/// Used by transitions that take no version from the caller (soft delete).
/// The live condition is part of the statement, so a row that became
/// invisible concurrently is reported as missing.
pub(crate) async fn update_unversioned<E, C>(
    db: &C,
    id: Uuid,
    changes: Vec<(E::Column, SimpleExpr)>,
    now: DateTime<Utc>,
) -> ResultEngine<()>
where
    E: VersionedEntity,
    C: ConnectionTrait,
{
    let mut update = E::update_many()
        .col_expr(E::version_column(), Expr::col(E::version_column()).add(1))
        .col_expr(E::updated_at_column(), Expr::value(now));
    for (column, value) in changes {
        update = update.col_expr(column, value);
    }

    let result = update
        .filter(E::id_column().eq(id))
        .filter(E::live_condition())
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(not_found::<E>(id));
    }
    tracing::debug!(entity = E::LABEL, %id, "updated without version check");
    Ok(())
}
