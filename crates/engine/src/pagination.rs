//! Offset pagination for list queries.

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Zero-based page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

impl PageRequest {
    #[must_use]
    pub const fn new(page: u64, size: u64) -> Self {
        Self { page, size }
    }

    /// Default page for category listings.
    #[must_use]
    pub const fn categories() -> Self {
        Self::new(0, 50)
    }

    /// Default page for reading history.
    #[must_use]
    pub const fn readings() -> Self {
        Self::new(0, 50)
    }

    /// Default page for transaction listings.
    #[must_use]
    pub const fn transactions() -> Self {
        Self::new(0, 20)
    }

    pub(crate) fn validate(self) -> ResultEngine<Self> {
        if self.size == 0 || self.size > MAX_PAGE_SIZE {
            return Err(EngineError::Validation(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(self)
    }
}

/// One page of results plus the totals needed to navigate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub(crate) fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Self {
            items,
            page: request.page,
            size: request.size,
            total_items,
            total_pages: total_items.div_ceil(request.size),
        }
    }
}
