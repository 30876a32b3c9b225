//! Internal helpers for input validation and normalization.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation so every registry rejects malformed input the same way, before
//! any store access.

use chrono::{DateTime, Utc};
use unicode_normalization::UnicodeNormalization;

use crate::{EngineError, ResultEngine};

/// Maximum length of account and category names.
pub(crate) const MAX_NAME_LEN: usize = 100;
/// Maximum length of a transaction description.
pub(crate) const MAX_DESCRIPTION_LEN: usize = 500;

/// Trim a required text field and check it is non-blank and short enough.
pub(crate) fn normalize_required_text(
    value: &str,
    label: &str,
    max_len: usize,
) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{label} is required")));
    }
    if trimmed.chars().count() > max_len {
        return Err(EngineError::Validation(format!(
            "{label} must not exceed {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Case-insensitive comparison key for names.
///
/// Applies NFKC so visually identical spellings collide, then lower-cases.
pub(crate) fn name_key(display: &str) -> String {
    display
        .trim()
        .nfkc()
        .flat_map(char::to_lowercase)
        .collect()
}

/// Reject timestamps later than `now`.
pub(crate) fn ensure_not_future(
    value: DateTime<Utc>,
    now: DateTime<Utc>,
    label: &str,
) -> ResultEngine<()> {
    if value > now {
        return Err(EngineError::Validation(format!(
            "{label} must not be in the future"
        )));
    }
    Ok(())
}
