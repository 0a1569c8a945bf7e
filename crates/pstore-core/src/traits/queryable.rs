//! Lazy, restartable queries over a store.

use async_trait::async_trait;

use crate::result::StoreResult;
use crate::types::criteria::{Criteria, Criterion};
use crate::types::query::{SelectQuery, Tracking};
use crate::types::sorting::SortField;

/// Something a [`Queryable`] can run against.
#[async_trait]
pub trait QuerySource<T>: Send + Sync {
    /// Run a select with the given tracking behaviour.
    async fn load(&self, query: &SelectQuery, tracking: Tracking) -> StoreResult<Vec<T>>;

    /// Count the objects matching `criteria` that a query with the given
    /// tracking behaviour would return.
    async fn count_matching(&self, criteria: &Criteria, tracking: Tracking) -> StoreResult<u64>;
}

/// A query that has not run yet.
///
/// Combinators only change the description; every terminal (`to_list`,
/// `first`, `count`, `any`) issues a fresh request, so a `Queryable` can be
/// run any number of times.
pub struct Queryable<'a, T> {
    source: &'a dyn QuerySource<T>,
    select: SelectQuery,
    tracking: Tracking,
}

impl<'a, T: Send> Queryable<'a, T> {
    /// A query over the whole collection.
    pub fn new(source: &'a dyn QuerySource<T>, tracking: Tracking) -> Self {
        Self {
            source,
            select: SelectQuery::default(),
            tracking,
        }
    }

    /// AND a condition into the filter.
    pub fn filter(mut self, criterion: &dyn Criterion) -> Self {
        self.select.criteria = std::mem::take(&mut self.select.criteria).and(criterion.criteria());
        self
    }

    /// Replace the ordering with a single sort key.
    pub fn order_by(mut self, sort: SortField) -> Self {
        self.select.sort = vec![sort];
        self
    }

    /// Append a secondary sort key.
    pub fn then_by(mut self, sort: SortField) -> Self {
        self.select.sort.push(sort);
        self
    }

    /// Skip the first `n` results of the current window.
    pub fn skip(mut self, n: u64) -> Self {
        self.select.offset = self.select.offset.saturating_add(n);
        self.select.limit = self.select.limit.map(|limit| limit.saturating_sub(n));
        self
    }

    /// Keep at most `n` results of the current window.
    pub fn take(mut self, n: u64) -> Self {
        self.select.limit = Some(self.select.limit.map_or(n, |limit| limit.min(n)));
        self
    }

    /// Tracking behaviour of this query.
    pub fn tracking(&self) -> Tracking {
        self.tracking
    }

    /// The select this query will issue.
    pub fn select(&self) -> &SelectQuery {
        &self.select
    }

    /// Run the query and collect every result.
    pub async fn to_list(&self) -> StoreResult<Vec<T>> {
        self.source.load(&self.select, self.tracking).await
    }

    /// Run the query and return the first result, if any.
    pub async fn first(&self) -> StoreResult<Option<T>> {
        let mut select = self.select.clone();
        select.limit = Some(select.limit.map_or(1, |limit| limit.min(1)));
        let mut items = self.source.load(&select, self.tracking).await?;
        Ok(if items.is_empty() {
            None
        } else {
            Some(items.swap_remove(0))
        })
    }

    /// Count the results within the current window.
    pub async fn count(&self) -> StoreResult<u64> {
        self.select.validate()?;
        let total = self.source
            .count_matching(&self.select.criteria, self.tracking)
            .await?;
        let after_skip = total.saturating_sub(self.select.offset);
        Ok(self
            .select
            .limit
            .map_or(after_skip, |limit| after_skip.min(limit)))
    }

    /// Whether the query has at least one result.
    pub async fn any(&self) -> StoreResult<bool> {
        Ok(self.count().await? > 0)
    }
}
