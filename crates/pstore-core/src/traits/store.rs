//! Generic persistent store trait for data access.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::result::StoreResult;
use crate::traits::persistent_object::PersistentObject;
use crate::traits::queryable::Queryable;
use crate::types::criteria::Criterion;
use crate::types::key::StoreKey;
use crate::types::pagination::PagerList;
use crate::types::query::QueryBase;

/// Typed data-access facade over one collection of persistent objects.
///
/// A store is scoped to a single unit of work. Reads come in two flavours:
/// tracked reads attach results to the unit of work (so later reads of the
/// same key see staged changes), `_as_no_tracking` reads bypass it. Writes
/// are staged and only reach the backend when the unit of work commits.
///
/// `K` defaults to [`Uuid`], so `dyn PersistentStore<Customer>` is the
/// common spelling.
#[async_trait]
pub trait PersistentStore<T, K = Uuid>: Send + Sync
where
    T: PersistentObject<K>,
    K: StoreKey,
{
    /// Every object, not attached to the unit of work.
    fn find_as_no_tracking(&self) -> Queryable<'_, T>;

    /// Every object, attached to the unit of work.
    fn find(&self) -> Queryable<'_, T>;

    /// Tracked objects matching `criteria`. Malformed criteria fail when the
    /// query runs.
    fn find_by(&self, criteria: &dyn Criterion) -> Queryable<'_, T> {
        self.find().filter(criteria)
    }

    /// Find an object by key.
    async fn find_by_id(&self, id: &K) -> StoreResult<Option<T>>;

    /// Find an object by key, failing with `NotFound` when it is absent.
    async fn get(&self, id: &K) -> StoreResult<T> {
        self.find_by_id(id).await?.ok_or_else(|| {
            StoreError::not_found(format!("{} {id} not found", T::COLLECTION))
        })
    }

    /// Find the objects with the given keys. Missing keys are skipped.
    async fn find_by_ids(&self, ids: &[K]) -> StoreResult<Vec<T>>;

    /// The only object matching `criteria`; `Cardinality` error otherwise.
    async fn single(&self, criteria: &dyn Criterion) -> StoreResult<T>;

    /// Whether every key is present. An empty key list yields `false`.
    async fn exists(&self, ids: &[K]) -> StoreResult<bool>;

    /// Tracked objects matching the query's filter, in its order. Paging is
    /// ignored.
    async fn query(&self, query: &QueryBase) -> StoreResult<Vec<T>>;

    /// As [`query`](Self::query), without tracking.
    async fn query_as_no_tracking(&self, query: &QueryBase) -> StoreResult<Vec<T>>;

    /// One tracked page of the query plus the total match count.
    async fn pager_query(&self, query: &QueryBase) -> StoreResult<PagerList<T>>;

    /// As [`pager_query`](Self::pager_query), without tracking.
    async fn pager_query_as_no_tracking(&self, query: &QueryBase) -> StoreResult<PagerList<T>>;

    /// Stage an object for insertion.
    async fn add(&self, object: T) -> StoreResult<()>;

    /// Stage several objects for insertion. Nothing is staged if any fails.
    async fn add_range(&self, objects: Vec<T>) -> StoreResult<()>;

    /// Stage an object for update.
    async fn update(&self, object: T) -> StoreResult<()>;

    /// Stage the object with `id` for removal.
    async fn remove_by_id(&self, id: &K) -> StoreResult<()>;

    /// Stage an object for removal.
    async fn remove(&self, object: &T) -> StoreResult<()> {
        self.remove_by_id(object.id()).await
    }

    /// Stage several keys for removal. Nothing is staged if any is missing.
    async fn remove_by_ids(&self, ids: &[K]) -> StoreResult<()>;

    /// Stage several objects for removal.
    async fn remove_range(&self, objects: &[T]) -> StoreResult<()> {
        let ids: Vec<K> = objects.iter().map(|o| o.id().clone()).collect();
        self.remove_by_ids(&ids).await
    }
}
