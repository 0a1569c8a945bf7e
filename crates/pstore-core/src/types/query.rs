//! Query descriptors.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::criteria::{Criteria, Criterion};
use crate::types::pagination::PageRequest;
use crate::types::sorting::SortField;

/// Whether loaded objects are attached to the unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracking {
    /// Results join the identity map; tracked instances win over stored rows.
    Tracked,
    /// Results come straight from the backend and are not remembered.
    NoTracking,
}

/// A structured query: filter, ordering, and optional paging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryBase {
    /// Filter applied to the collection.
    #[serde(default)]
    pub criteria: Criteria,
    /// Ordering, most significant first.
    #[serde(default)]
    pub sort: Vec<SortField>,
    /// Paging parameters; required by paged queries.
    #[serde(default)]
    pub page: Option<PageRequest>,
}

impl QueryBase {
    /// A query matching the whole collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// AND another condition into the filter.
    pub fn filter(mut self, criterion: &dyn Criterion) -> Self {
        self.criteria = std::mem::take(&mut self.criteria).and(criterion.criteria());
        self
    }

    /// Append a sort key.
    pub fn order_by(mut self, sort: SortField) -> Self {
        self.sort.push(sort);
        self
    }

    /// Set the page to fetch.
    pub fn page(mut self, page: u64, page_size: u64) -> Self {
        self.page = Some(PageRequest::new(page, page_size));
        self
    }

    /// The page to fetch, or the default first page.
    pub fn page_or_default(&self, default_page_size: u64) -> PageRequest {
        self.page
            .unwrap_or_else(|| PageRequest::first(default_page_size))
    }
}

/// What a backend is asked to load: a filtered, ordered window of one
/// collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    /// Filter.
    pub criteria: Criteria,
    /// Ordering, most significant first. Backends break ties by key.
    pub sort: Vec<SortField>,
    /// Rows to skip.
    pub offset: u64,
    /// Maximum rows to return.
    pub limit: Option<u64>,
}

impl SelectQuery {
    /// Check criteria and sort keys.
    pub fn validate(&self) -> Result<(), StoreError> {
        self.criteria.validate()?;
        self.sort.iter().try_for_each(SortField::validate)
    }
}

impl From<&QueryBase> for SelectQuery {
    fn from(query: &QueryBase) -> Self {
        Self {
            criteria: query.criteria.clone(),
            sort: query.sort.clone(),
            offset: 0,
            limit: None,
        }
    }
}
