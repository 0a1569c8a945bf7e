//! Typed persistent store bound to a unit of work.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use pstore_core::error::StoreError;
use pstore_core::result::StoreResult;
use pstore_core::traits::{PersistentObject, PersistentStore, QuerySource, Queryable, StorageBackend};
use pstore_core::types::{
    Criteria, Criterion, PagerList, QueryBase, SelectQuery, StoreKey, StoredDocument, Tracking,
};

use crate::unit_of_work::{Known, UnitOfWork};

/// [`PersistentStore`] implementation over any [`StorageBackend`].
///
/// Obtain one with [`UnitOfWork::store`]. Stores are cheap handles: every
/// store created from the same unit of work shares its identity map and
/// change set.
pub struct Store<T, K, B: StorageBackend> {
    uow: Arc<UnitOfWork<B>>,
    _types: PhantomData<fn() -> (T, K)>,
}

/// A store keyed by [`Uuid`].
pub type DefaultStore<T, B> = Store<T, Uuid, B>;

impl<T, K, B: StorageBackend> Clone for Store<T, K, B> {
    fn clone(&self) -> Self {
        Self {
            uow: Arc::clone(&self.uow),
            _types: PhantomData,
        }
    }
}

impl<T, K, B> Store<T, K, B>
where
    T: PersistentObject<K>,
    K: StoreKey,
    B: StorageBackend,
{
    pub(crate) fn new(uow: Arc<UnitOfWork<B>>) -> Self {
        Self {
            uow,
            _types: PhantomData,
        }
    }

    /// The unit of work this store stages changes in.
    pub fn unit_of_work(&self) -> &Arc<UnitOfWork<B>> {
        &self.uow
    }

    /// Commit the shared unit of work.
    pub async fn commit(&self) -> StoreResult<usize> {
        self.uow.commit().await
    }

    fn encode(object: &T) -> StoreResult<(String, Value)> {
        object.validate()?;
        Ok((object.id().to_storage_key(), serde_json::to_value(object)?))
    }

    fn decode(data: Value) -> StoreResult<T> {
        Ok(serde_json::from_value(data)?)
    }

    fn decode_all(docs: Vec<StoredDocument>) -> StoreResult<Vec<T>> {
        docs.into_iter().map(|doc| Self::decode(doc.data)).collect()
    }

    /// Storage keys of `ids`, first occurrence order, duplicates dropped.
    fn unique_keys(ids: &[K]) -> Vec<String> {
        let mut seen = HashSet::new();
        ids.iter()
            .map(StoreKey::to_storage_key)
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }

    async fn paged(&self, query: &QueryBase, tracking: Tracking) -> StoreResult<PagerList<T>> {
        let paging = self.uow.paging();
        let page = query.page_or_default(paging.default_page_size);
        page.validate(paging)?;

        let select = SelectQuery {
            offset: page.offset(),
            limit: Some(page.limit()),
            ..SelectQuery::from(query)
        };
        select.validate()?;
        let total = self.count_matching(&select.criteria, tracking).await?;
        if total == 0 {
            return Ok(PagerList::empty(&page));
        }
        let items = self.load(&select, tracking).await?;

        debug!(
            collection = T::COLLECTION,
            page = page.page,
            page_size = page.page_size,
            total,
            "Paged query"
        );
        Ok(PagerList::new(items, &page, total))
    }

    /// Fetch a window for a tracked read.
    ///
    /// Keys staged for removal must not count towards the window, so when
    /// there are any the backend is asked for the whole prefix plus one row
    /// per removal and the window is cut after attaching.
    async fn fetch_tracked(&self, query: &SelectQuery) -> StoreResult<Vec<StoredDocument>> {
        let removed = self.uow.removed_keys(T::COLLECTION)?.len() as u64;
        if removed == 0 {
            let docs = self.uow.backend().fetch(T::COLLECTION, query).await?;
            return self.uow.attach(T::COLLECTION, docs);
        }

        let widened = SelectQuery {
            offset: 0,
            limit: query
                .limit
                .map(|limit| query.offset.saturating_add(limit).saturating_add(removed)),
            ..query.clone()
        };
        let docs = self.uow.backend().fetch(T::COLLECTION, &widened).await?;
        let visible = self
            .uow
            .attach(T::COLLECTION, docs)?
            .into_iter()
            .skip(usize::try_from(query.offset).unwrap_or(usize::MAX));
        Ok(match query.limit {
            Some(limit) => visible
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect(),
            None => visible.collect(),
        })
    }
}

#[async_trait]
impl<T, K, B> QuerySource<T> for Store<T, K, B>
where
    T: PersistentObject<K>,
    K: StoreKey,
    B: StorageBackend,
{
    async fn load(&self, query: &SelectQuery, tracking: Tracking) -> StoreResult<Vec<T>> {
        query.validate()?;
        let docs = match tracking {
            Tracking::Tracked => self.fetch_tracked(query).await?,
            Tracking::NoTracking => self.uow.backend().fetch(T::COLLECTION, query).await?,
        };
        Self::decode_all(docs)
    }

    async fn count_matching(&self, criteria: &Criteria, tracking: Tracking) -> StoreResult<u64> {
        criteria.validate()?;
        let backend = self.uow.backend();
        let total = backend.count(T::COLLECTION, criteria).await?;
        if tracking == Tracking::NoTracking {
            return Ok(total);
        }

        let removed = self.uow.removed_keys(T::COLLECTION)?;
        if removed.is_empty() {
            return Ok(total);
        }
        let hidden = backend.count_keys(T::COLLECTION, criteria, &removed).await?;
        Ok(total.saturating_sub(hidden))
    }
}

#[async_trait]
impl<T, K, B> PersistentStore<T, K> for Store<T, K, B>
where
    T: PersistentObject<K>,
    K: StoreKey,
    B: StorageBackend,
{
    fn find_as_no_tracking(&self) -> Queryable<'_, T> {
        Queryable::new(self, Tracking::NoTracking)
    }

    fn find(&self) -> Queryable<'_, T> {
        Queryable::new(self, Tracking::Tracked)
    }

    async fn find_by_id(&self, id: &K) -> StoreResult<Option<T>> {
        let key = id.to_storage_key();
        match self.uow.known(T::COLLECTION, &key)? {
            Known::Present(data) => Ok(Some(Self::decode(data)?)),
            Known::Removed => Ok(None),
            Known::Unknown => {
                let docs = self
                    .uow
                    .backend()
                    .fetch_by_keys(T::COLLECTION, std::slice::from_ref(&key))
                    .await?;
                let mut docs = self.uow.attach(T::COLLECTION, docs)?;
                docs.pop().map(|doc| Self::decode(doc.data)).transpose()
            }
        }
    }

    async fn find_by_ids(&self, ids: &[K]) -> StoreResult<Vec<T>> {
        let keys = Self::unique_keys(ids);
        let mut values: HashMap<String, Value> = HashMap::with_capacity(keys.len());
        let mut unknown = Vec::new();
        for key in &keys {
            match self.uow.known(T::COLLECTION, key)? {
                Known::Present(data) => {
                    values.insert(key.clone(), data);
                }
                Known::Removed => {}
                Known::Unknown => unknown.push(key.clone()),
            }
        }

        if !unknown.is_empty() {
            let docs = self.uow.backend().fetch_by_keys(T::COLLECTION, &unknown).await?;
            for doc in self.uow.attach(T::COLLECTION, docs)? {
                values.insert(doc.key, doc.data);
            }
        }

        keys.iter()
            .filter_map(|key| values.remove(key))
            .map(Self::decode)
            .collect()
    }

    async fn single(&self, criteria: &dyn Criterion) -> StoreResult<T> {
        let mut matches = self.find_by(criteria).take(2).to_list().await?;
        match matches.len() {
            1 => Ok(matches.swap_remove(0)),
            n => Err(StoreError::cardinality(T::COLLECTION, n)),
        }
    }

    async fn exists(&self, ids: &[K]) -> StoreResult<bool> {
        let keys = Self::unique_keys(ids);
        if keys.is_empty() {
            return Ok(false);
        }

        let mut unknown = Vec::new();
        for key in keys {
            match self.uow.known(T::COLLECTION, &key)? {
                Known::Present(_) => {}
                Known::Removed => return Ok(false),
                Known::Unknown => unknown.push(key),
            }
        }
        if unknown.is_empty() {
            return Ok(true);
        }

        let found = self
            .uow
            .backend()
            .fetch_by_keys(T::COLLECTION, &unknown)
            .await?;
        Ok(found.len() == unknown.len())
    }

    async fn query(&self, query: &QueryBase) -> StoreResult<Vec<T>> {
        self.load(&SelectQuery::from(query), Tracking::Tracked).await
    }

    async fn query_as_no_tracking(&self, query: &QueryBase) -> StoreResult<Vec<T>> {
        self.load(&SelectQuery::from(query), Tracking::NoTracking)
            .await
    }

    async fn pager_query(&self, query: &QueryBase) -> StoreResult<PagerList<T>> {
        self.paged(query, Tracking::Tracked).await
    }

    async fn pager_query_as_no_tracking(&self, query: &QueryBase) -> StoreResult<PagerList<T>> {
        self.paged(query, Tracking::NoTracking).await
    }

    async fn add(&self, object: T) -> StoreResult<()> {
        let entry = Self::encode(&object)?;
        self.uow.stage_inserts(T::COLLECTION, vec![entry])
    }

    async fn add_range(&self, objects: Vec<T>) -> StoreResult<()> {
        let entries = objects
            .iter()
            .map(Self::encode)
            .collect::<StoreResult<Vec<_>>>()?;
        debug!(collection = T::COLLECTION, count = entries.len(), "Adding range");
        self.uow.stage_inserts(T::COLLECTION, entries)
    }

    async fn update(&self, object: T) -> StoreResult<()> {
        let (key, data) = Self::encode(&object)?;
        let unverified = self
            .uow
            .unverified_keys(T::COLLECTION, std::slice::from_ref(&key))?;
        self.uow.ensure_stored(T::COLLECTION, &unverified).await?;
        self.uow.stage_update(T::COLLECTION, key, data)
    }

    async fn remove_by_id(&self, id: &K) -> StoreResult<()> {
        self.remove_by_ids(std::slice::from_ref(id)).await
    }

    async fn remove_by_ids(&self, ids: &[K]) -> StoreResult<()> {
        let keys = Self::unique_keys(ids);
        self.uow.remove_documents(T::COLLECTION, &keys).await?;
        Ok(())
    }
}
