use chrono::Utc;
use uuid::Uuid;

use sea_orm::{QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{
    Account, AccountKind, AccountUpdate, CurrencyCode, EngineError, ResultEngine, accounts,
    store,
    util::{MAX_NAME_LEN, normalize_required_text},
};

use super::{Engine, readings::count_active_readings, with_tx};

/// Maximum number of accounts the registry holds.
pub const ACCOUNT_LIMIT: u64 = 1000;

impl Engine {
    /// Creates an account at version 0.
    ///
    /// Fails with `LimitExceeded` when [`ACCOUNT_LIMIT`] accounts already
    /// exist.
    pub async fn create_account(
        &self,
        name: &str,
        kind: AccountKind,
        currency: &str,
    ) -> ResultEngine<Account> {
        let name = normalize_required_text(name, "account name", MAX_NAME_LEN)?;
        let currency = CurrencyCode::try_from(currency)?;
        with_tx!(self, |db_tx| {
            let existing = store::count::<accounts::Entity, _>(&db_tx).await?;
            if existing >= ACCOUNT_LIMIT {
                return Err(EngineError::LimitExceeded(format!(
                    "account limit of {ACCOUNT_LIMIT} reached"
                )));
            }

            let account = Account::new(name, kind, currency, Utc::now());
            store::insert(&db_tx, accounts::ActiveModel::from(&account)).await?;
            tracing::debug!(account_id = %account.id, "account created");
            Ok(account)
        })
    }

    /// All accounts ordered by name, then id.
    pub async fn list_accounts(&self) -> ResultEngine<Vec<Account>> {
        let models = accounts::Entity::find()
            .order_by_asc(accounts::Column::Name)
            .order_by_asc(accounts::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(Account::try_from).collect()
    }

    pub async fn account(&self, account_id: Uuid) -> ResultEngine<Account> {
        let model = store::get::<accounts::Entity, _>(&self.database, account_id).await?;
        Account::try_from(model)
    }

    /// Applies a partial update, keeping every field left as `None`.
    pub async fn update_account(
        &self,
        account_id: Uuid,
        version: i32,
        update: AccountUpdate,
    ) -> ResultEngine<Account> {
        let mut changes = Vec::new();
        if let Some(name) = update.name.as_deref() {
            let name = normalize_required_text(name, "account name", MAX_NAME_LEN)?;
            changes.push((accounts::Column::Name, Expr::value(name)));
        }
        if let Some(kind) = update.kind {
            changes.push((accounts::Column::Kind, Expr::value(kind.as_str())));
        }
        if let Some(currency) = update.currency.as_deref() {
            let currency = CurrencyCode::try_from(currency)?;
            changes.push((
                accounts::Column::Currency,
                Expr::value(currency.code().to_string()),
            ));
        }

        with_tx!(self, |db_tx| {
            store::compare_and_swap::<accounts::Entity, _>(
                &db_tx,
                account_id,
                version,
                changes,
                Utc::now(),
            )
            .await?;
            let model = store::get::<accounts::Entity, _>(&db_tx, account_id).await?;
            Account::try_from(model)
        })
    }

    /// Deletes an account that has no active readings.
    ///
    /// Soft-deleted readings do not block deletion. They are physically
    /// removed with the account by the `readings.account_id` cascade, so the
    /// tombstone history of a deleted account is not kept; readings of live
    /// accounts are never hard-deleted.
    pub async fn delete_account(&self, account_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            if !store::exists::<accounts::Entity, _>(&db_tx, account_id).await? {
                return Err(EngineError::NotFound(format!("account {account_id}")));
            }

            let active = count_active_readings(&db_tx, account_id).await?;
            if active > 0 {
                return Err(EngineError::InUse {
                    entity: format!("account {account_id}"),
                    count: active,
                });
            }

            store::delete::<accounts::Entity, _>(&db_tx, account_id).await
        })
    }
}
