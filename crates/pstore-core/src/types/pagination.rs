//! Pagination types for paged queries.

use serde::{Deserialize, Serialize};

use crate::config::PagingConfig;
use crate::config::paging::DEFAULT_PAGE_SIZE;
use crate::error::StoreError;

/// Paging parameters of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-based).
    #[serde(default = "default_page")]
    pub page: u64,
    /// Number of items per page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl PageRequest {
    /// Create a new page request. Values are checked by [`Self::validate`]
    /// when the query runs.
    pub fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size }
    }

    /// The first page with the given size.
    pub fn first(page_size: u64) -> Self {
        Self::new(1, page_size)
    }

    /// Check the request against the configured limits.
    pub fn validate(&self, limits: &PagingConfig) -> Result<(), StoreError> {
        if self.page == 0 {
            return Err(StoreError::validation("Page number must be at least 1"));
        }
        if self.page_size == 0 || self.page_size > limits.max_page_size {
            return Err(StoreError::validation(format!(
                "Page size must be between 1 and {}, got {}",
                limits.max_page_size, self.page_size
            )));
        }
        Ok(())
    }

    /// Number of items to skip.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Maximum number of items to return.
    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of a larger result set plus the size of the whole set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagerList<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Current page number (1-based).
    pub page: u64,
    /// Number of items per page.
    pub page_size: u64,
    /// Total number of matching items across all pages.
    pub total_items: u64,
    /// Total number of pages.
    pub total_pages: u64,
    /// Whether there is a next page.
    pub has_next: bool,
    /// Whether there is a previous page.
    pub has_previous: bool,
}

impl<T> PagerList<T> {
    /// Create a page from its items and the total count.
    pub fn new(items: Vec<T>, page: &PageRequest, total_items: u64) -> Self {
        let total_pages = if total_items == 0 {
            1
        } else {
            total_items.div_ceil(page.page_size.max(1))
        };
        Self {
            items,
            page: page.page,
            page_size: page.page_size,
            total_items,
            total_pages,
            has_next: page.page < total_pages,
            has_previous: page.page > 1,
        }
    }

    /// Create an empty page.
    pub fn empty(page: &PageRequest) -> Self {
        Self::new(Vec::new(), page, 0)
    }
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}
