//! Paging limits.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Default page size.
pub const DEFAULT_PAGE_SIZE: u64 = 25;
/// Maximum page size.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Limits applied when a paged query is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingConfig {
    /// Page size used when a caller does not pick one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    /// Largest page size a paged query may request.
    #[serde(default = "max_page_size")]
    pub max_page_size: u64,
}

impl PagingConfig {
    /// Reject limits that could never produce a valid page.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.max_page_size == 0 {
            return Err(StoreError::configuration(
                "paging.max_page_size must be at least 1",
            ));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(StoreError::configuration(format!(
                "paging.default_page_size must be between 1 and {}",
                self.max_page_size
            )));
        }
        Ok(())
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn max_page_size() -> u64 {
    MAX_PAGE_SIZE
}
