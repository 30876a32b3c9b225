//! The module contains the errors the engine can return.
//!
//! Every registry operation reports failures through [`EngineError`]. The
//! variants are the stable taxonomy exposed to whatever boundary wraps the
//! engine:
//!
//! - [`NotFound`] a referenced entity does not exist (a soft-deleted reading
//!   counts as missing).
//! - [`VersionConflict`] the caller presented a stale version.
//! - [`NameConflict`] a category with the same name already exists.
//! - [`InUse`] deletion is blocked by live dependents.
//! - [`LimitExceeded`] the account cap has been reached.
//! - [`Validation`] malformed input, detected before touching the store.
//! - [`FatalConfiguration`] the default category is missing.
//!
//!  [`NotFound`]: EngineError::NotFound
//!  [`VersionConflict`]: EngineError::VersionConflict
//!  [`NameConflict`]: EngineError::NameConflict
//!  [`InUse`]: EngineError::InUse
//!  [`LimitExceeded`]: EngineError::LimitExceeded
//!  [`Validation`]: EngineError::Validation
//!  [`FatalConfiguration`]: EngineError::FatalConfiguration
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Version mismatch: {0} has been modified")]
    VersionConflict(String),
    #[error("\"{0}\" already present!")]
    NameConflict(String),
    #[error("{entity} is in use by {count} record(s)")]
    InUse { entity: String, count: u64 },
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Fatal configuration error: {0}")]
    FatalConfiguration(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Stable, machine readable code for the error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::VersionConflict(_) => "version_conflict",
            Self::NameConflict(_) => "conflict",
            Self::InUse { .. } => "in_use",
            Self::LimitExceeded(_) => "limit_exceeded",
            Self::Validation(_) => "validation_error",
            Self::FatalConfiguration(_) => "fatal_configuration",
            Self::Database(_) => "database",
        }
    }

    /// `true` when the same call may succeed after re-reading the entity.
    ///
    /// Only version conflicts qualify: the caller fetches the fresh version
    /// and tries again. Everything else fails the same way on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::VersionConflict(a), Self::VersionConflict(b)) => a == b,
            (Self::NameConflict(a), Self::NameConflict(b)) => a == b,
            (
                Self::InUse {
                    entity: a,
                    count: count_a,
                },
                Self::InUse {
                    entity: b,
                    count: count_b,
                },
            ) => a == b && count_a == count_b,
            (Self::LimitExceeded(a), Self::LimitExceeded(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::FatalConfiguration(a), Self::FatalConfiguration(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
