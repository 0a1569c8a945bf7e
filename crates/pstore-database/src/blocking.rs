//! Synchronous facade over the async store.
//!
//! Every call drives the async operation to completion on a private
//! current-thread tokio runtime. These types must not be used from inside
//! another tokio runtime; async callers use [`Store`] directly.

use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use pstore_core::error::{ErrorKind, StoreError};
use pstore_core::result::StoreResult;
use pstore_core::traits::{PersistentObject, PersistentStore, Queryable, StorageBackend};
use pstore_core::types::{Criterion, PagerList, QueryBase, SortField, StoreKey};

use crate::store::Store;
use crate::unit_of_work::UnitOfWork;

/// A runtime shared by blocking stores.
#[derive(Debug, Clone)]
pub struct BlockingRuntime {
    runtime: Arc<Runtime>,
}

impl BlockingRuntime {
    /// Build a current-thread runtime with I/O and timers enabled.
    pub fn new() -> StoreResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                StoreError::with_source(ErrorKind::Internal, "Failed to build tokio runtime", e)
            })?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }

    /// Run a future to completion.
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// A blocking store over `T`'s collection in `uow`.
    pub fn store<T, K, B>(&self, uow: &Arc<UnitOfWork<B>>) -> BlockingStore<T, K, B>
    where
        T: PersistentObject<K>,
        K: StoreKey,
        B: StorageBackend,
    {
        BlockingStore {
            runtime: self.clone(),
            inner: uow.store::<T, K>(),
        }
    }
}

/// Blocking counterpart of [`Store`], with identical semantics.
pub struct BlockingStore<T, K, B: StorageBackend> {
    runtime: BlockingRuntime,
    inner: Store<T, K, B>,
}

impl<T, K, B: StorageBackend> Clone for BlockingStore<T, K, B> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<T, K, B> BlockingStore<T, K, B>
where
    T: PersistentObject<K>,
    K: StoreKey,
    B: StorageBackend,
{
    /// The async store behind this facade.
    pub fn inner(&self) -> &Store<T, K, B> {
        &self.inner
    }

    pub fn find_as_no_tracking(&self) -> BlockingQuery<'_, T> {
        BlockingQuery::new(&self.runtime, self.inner.find_as_no_tracking())
    }

    pub fn find(&self) -> BlockingQuery<'_, T> {
        BlockingQuery::new(&self.runtime, self.inner.find())
    }

    pub fn find_by(&self, criteria: &dyn Criterion) -> BlockingQuery<'_, T> {
        BlockingQuery::new(&self.runtime, self.inner.find_by(criteria))
    }

    pub fn find_by_id(&self, id: &K) -> StoreResult<Option<T>> {
        self.runtime.block_on(self.inner.find_by_id(id))
    }

    pub fn get(&self, id: &K) -> StoreResult<T> {
        self.runtime.block_on(self.inner.get(id))
    }

    pub fn find_by_ids(&self, ids: &[K]) -> StoreResult<Vec<T>> {
        self.runtime.block_on(self.inner.find_by_ids(ids))
    }

    pub fn single(&self, criteria: &dyn Criterion) -> StoreResult<T> {
        self.runtime.block_on(self.inner.single(criteria))
    }

    pub fn exists(&self, ids: &[K]) -> StoreResult<bool> {
        self.runtime.block_on(self.inner.exists(ids))
    }

    pub fn query(&self, query: &QueryBase) -> StoreResult<Vec<T>> {
        self.runtime.block_on(self.inner.query(query))
    }

    pub fn query_as_no_tracking(&self, query: &QueryBase) -> StoreResult<Vec<T>> {
        self.runtime.block_on(self.inner.query_as_no_tracking(query))
    }

    pub fn pager_query(&self, query: &QueryBase) -> StoreResult<PagerList<T>> {
        self.runtime.block_on(self.inner.pager_query(query))
    }

    pub fn pager_query_as_no_tracking(&self, query: &QueryBase) -> StoreResult<PagerList<T>> {
        self.runtime
            .block_on(self.inner.pager_query_as_no_tracking(query))
    }

    pub fn add(&self, object: T) -> StoreResult<()> {
        self.runtime.block_on(self.inner.add(object))
    }

    pub fn add_range(&self, objects: Vec<T>) -> StoreResult<()> {
        self.runtime.block_on(self.inner.add_range(objects))
    }

    pub fn update(&self, object: T) -> StoreResult<()> {
        self.runtime.block_on(self.inner.update(object))
    }

    pub fn remove_by_id(&self, id: &K) -> StoreResult<()> {
        self.runtime.block_on(self.inner.remove_by_id(id))
    }

    pub fn remove(&self, object: &T) -> StoreResult<()> {
        self.runtime.block_on(self.inner.remove(object))
    }

    pub fn remove_by_ids(&self, ids: &[K]) -> StoreResult<()> {
        self.runtime.block_on(self.inner.remove_by_ids(ids))
    }

    pub fn remove_range(&self, objects: &[T]) -> StoreResult<()> {
        self.runtime.block_on(self.inner.remove_range(objects))
    }

    /// Commit the shared unit of work.
    pub fn commit(&self) -> StoreResult<usize> {
        self.runtime.block_on(self.inner.commit())
    }
}

/// Blocking counterpart of [`Queryable`].
pub struct BlockingQuery<'a, T> {
    runtime: &'a BlockingRuntime,
    query: Queryable<'a, T>,
}

impl<'a, T: Send> BlockingQuery<'a, T> {
    fn new(runtime: &'a BlockingRuntime, query: Queryable<'a, T>) -> Self {
        Self { runtime, query }
    }

    pub fn filter(self, criterion: &dyn Criterion) -> Self {
        Self::new(self.runtime, self.query.filter(criterion))
    }

    pub fn order_by(self, sort: SortField) -> Self {
        Self::new(self.runtime, self.query.order_by(sort))
    }

    pub fn then_by(self, sort: SortField) -> Self {
        Self::new(self.runtime, self.query.then_by(sort))
    }

    pub fn skip(self, n: u64) -> Self {
        Self::new(self.runtime, self.query.skip(n))
    }

    pub fn take(self, n: u64) -> Self {
        Self::new(self.runtime, self.query.take(n))
    }

    pub fn to_list(&self) -> StoreResult<Vec<T>> {
        self.runtime.block_on(self.query.to_list())
    }

    pub fn first(&self) -> StoreResult<Option<T>> {
        self.runtime.block_on(self.query.first())
    }

    pub fn count(&self) -> StoreResult<u64> {
        self.runtime.block_on(self.query.count())
    }

    pub fn any(&self) -> StoreResult<bool> {
        self.runtime.block_on(self.query.any())
    }
}
