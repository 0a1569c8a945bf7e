//! Storage backend trait for pluggable persistence engines.

use async_trait::async_trait;

use crate::result::StoreResult;
use crate::types::criteria::Criteria;
use crate::types::document::{PendingChange, StoredDocument};
use crate::types::query::SelectQuery;

/// Trait for storage engines (PostgreSQL, in-memory).
///
/// Backends work on untyped JSON documents grouped into collections. They
/// own filter translation and atomic application of a change set; they know
/// nothing about change tracking.
#[async_trait]
pub trait StorageBackend: Send + Sync + std::fmt::Debug + 'static {
    /// Load documents matching the query, ordered and windowed.
    ///
    /// Ties (and queries without sort keys) are ordered by key.
    async fn fetch(&self, collection: &str, query: &SelectQuery)
    -> StoreResult<Vec<StoredDocument>>;

    /// Count documents matching the criteria.
    async fn count(&self, collection: &str, criteria: &Criteria) -> StoreResult<u64>;

    /// Count documents matching the criteria among `keys`.
    async fn count_keys(
        &self,
        collection: &str,
        criteria: &Criteria,
        keys: &[String],
    ) -> StoreResult<u64>;

    /// Load the documents with the given keys. Missing keys are skipped.
    async fn fetch_by_keys(
        &self,
        collection: &str,
        keys: &[String],
    ) -> StoreResult<Vec<StoredDocument>>;

    /// Apply every change or none of them.
    ///
    /// Fails with `Conflict` when an insert hits an existing key and with
    /// `NotFound` when an update or delete targets a missing one.
    async fn apply(&self, changes: &[PendingChange]) -> StoreResult<()>;

    /// Check backend connectivity.
    async fn health_check(&self) -> StoreResult<bool>;
}
