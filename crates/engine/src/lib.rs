//! Domain core of the money tracker.
//!
//! The engine owns four entities (accounts, categories, balance readings and
//! transactions) and the rules that keep them consistent:
//!
//! - every entity carries an optimistic-lock `version`; updates must present
//!   the version they read and are rejected on mismatch (see [`EngineError`]);
//! - deletions are guarded by usage counts (readings per account,
//!   transactions per category);
//! - readings are soft-deleted and vanish from every query once deleted;
//! - transactions without an explicit category land in the predefined
//!   "Others" category, created by [`Engine::seed_predefined_categories`].
//!
//! All operations are `async` methods on [`Engine`].

pub use accounts::{Account, AccountKind, AccountUpdate};
pub use categories::Category;
pub use currency::CurrencyCode;
pub use error::EngineError;
pub use ops::{
    ACCOUNT_LIMIT, DEFAULT_CATEGORY_NAME, Engine, EngineBuilder, PREDEFINED_CATEGORIES,
    TransactionListFilter,
};
pub use pagination::{MAX_PAGE_SIZE, Page, PageRequest};
pub use readings::{AccountReading, Reading, ReadingUpdate};
pub use rust_decimal::Decimal;
pub use transactions::{
    NewTransaction, Stability, Summary, Transaction, TransactionKind, TransactionUpdate,
};

mod accounts;
mod categories;
mod currency;
mod error;
mod money;
mod ops;
mod pagination;
mod readings;
mod store;
mod transactions;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
