//! Unit of work: identity map, staged changes, and the commit boundary.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, info, warn};

use pstore_core::config::PagingConfig;
use pstore_core::error::StoreError;
use pstore_core::result::StoreResult;
use pstore_core::traits::{PersistentObject, StorageBackend};
use pstore_core::types::{ChangeKind, PendingChange, StoredDocument, StoreKey};

use crate::store::Store;

type Slot = (String, String);

/// What the unit of work knows about one key.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Known {
    /// Tracked or staged; the current value.
    Present(Value),
    /// Staged for removal.
    Removed,
    /// Never seen in this session.
    Unknown,
}

#[derive(Debug, Default)]
struct SessionState {
    /// Identity map: the current value of every tracked or staged object.
    tracked: HashMap<Slot, Value>,
    /// Staged changes in the order they will be applied.
    pending: Vec<PendingChange>,
}

impl SessionState {
    fn pending_index(&self, collection: &str, key: &str) -> Option<usize> {
        self.pending
            .iter()
            .position(|c| c.collection == collection && c.key == key)
    }

    fn known(&self, collection: &str, key: &str) -> Known {
        if let Some(i) = self.pending_index(collection, key) {
            if self.pending[i].kind == ChangeKind::Delete {
                return Known::Removed;
            }
        }
        match self.tracked.get(&(collection.to_string(), key.to_string())) {
            Some(value) => Known::Present(value.clone()),
            None => Known::Unknown,
        }
    }

    fn removed_keys(&self, collection: &str) -> Vec<String> {
        self.pending
            .iter()
            .filter(|c| c.collection == collection && c.kind == ChangeKind::Delete)
            .map(|c| c.key.clone())
            .collect()
    }
}

/// One session against a storage backend.
///
/// Every [`Store`] created from the same unit of work shares its identity
/// map and change set. Writes are staged until [`commit`](Self::commit),
/// which hands the whole change set to the backend as one atomic batch.
///
/// A unit of work is meant for one logical caller at a time. It is `Sync`,
/// but concurrent use gives no ordering guarantees.
#[derive(Debug)]
pub struct UnitOfWork<B: StorageBackend> {
    backend: Arc<B>,
    paging: PagingConfig,
    state: Mutex<SessionState>,
}

impl<B: StorageBackend> UnitOfWork<B> {
    /// Start a session with default paging limits.
    pub fn new(backend: Arc<B>) -> Arc<Self> {
        Self::with_paging(backend, PagingConfig::default())
    }

    /// Start a session with explicit paging limits.
    pub fn with_paging(backend: Arc<B>, paging: PagingConfig) -> Arc<Self> {
        Arc::new(Self {
            backend,
            paging,
            state: Mutex::new(SessionState::default()),
        })
    }

    /// A typed store over `T`'s collection in this session.
    pub fn store<T, K>(self: &Arc<Self>) -> Store<T, K, B>
    where
        T: PersistentObject<K>,
        K: StoreKey,
    {
        Store::new(Arc::clone(self))
    }

    /// The backend this session commits to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Paging limits applied to paged queries.
    pub fn paging(&self) -> &PagingConfig {
        &self.paging
    }

    /// Whether there are staged changes.
    pub fn has_changes(&self) -> bool {
        self.pending_count() > 0
    }

    /// Number of staged changes.
    pub fn pending_count(&self) -> usize {
        self.state().map_or(0, |s| s.pending.len())
    }

    /// Number of objects in the identity map.
    pub fn tracked_count(&self) -> usize {
        self.state().map_or(0, |s| s.tracked.len())
    }

    /// Apply every staged change atomically. Returns the number applied.
    ///
    /// On failure nothing is written and the staged changes are kept, so the
    /// caller can inspect them or [`discard`](Self::discard) them.
    pub async fn commit(&self) -> StoreResult<usize> {
        let changes = self.state()?.pending.clone();
        if changes.is_empty() {
            return Ok(0);
        }

        if let Err(e) = self.backend.apply(&changes).await {
            warn!(changes = changes.len(), error = %e, "Commit rejected by backend");
            return Err(e);
        }

        let mut state = self.state()?;
        let applied = changes.len().min(state.pending.len());
        state.pending.drain(..applied);
        info!(changes = applied, "Unit of work committed");
        Ok(applied)
    }

    /// Drop staged changes and forget every tracked object.
    pub fn discard(&self) -> StoreResult<()> {
        let mut state = self.state()?;
        debug!(
            pending = state.pending.len(),
            tracked = state.tracked.len(),
            "Discarding unit of work"
        );
        state.pending.clear();
        state.tracked.clear();
        Ok(())
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, SessionState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::internal("unit of work lock poisoned"))
    }

    pub(crate) fn known(&self, collection: &str, key: &str) -> StoreResult<Known> {
        Ok(self.state()?.known(collection, key))
    }

    /// Keys of `collection` currently staged for removal.
    pub(crate) fn removed_keys(&self, collection: &str) -> StoreResult<Vec<String>> {
        Ok(self.state()?.removed_keys(collection))
    }

    /// Stage removal of documents by storage key.
    ///
    /// Duplicate keys are ignored. Fails with `NotFound`, staging nothing,
    /// when any key is neither known to the session nor stored in the
    /// backend. Returns the number of keys staged.
    pub async fn remove_documents(&self, collection: &str, keys: &[String]) -> StoreResult<usize> {
        let mut seen = HashSet::new();
        let keys: Vec<String> = keys
            .iter()
            .filter(|key| seen.insert(key.as_str()))
            .cloned()
            .collect();
        if keys.is_empty() {
            return Ok(0);
        }

        let unverified = self.unverified_keys(collection, &keys)?;
        self.ensure_stored(collection, &unverified).await?;
        self.stage_deletes(collection, &keys)?;
        Ok(keys.len())
    }

    /// Fail with `NotFound` unless every key is stored in the backend.
    pub(crate) async fn ensure_stored(&self, collection: &str, keys: &[String]) -> StoreResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let found: HashSet<String> = self
            .backend
            .fetch_by_keys(collection, keys)
            .await?
            .into_iter()
            .map(|doc| doc.key)
            .collect();

        match keys.iter().find(|key| !found.contains(*key)) {
            Some(missing) => Err(StoreError::not_found(format!(
                "{collection} {missing} not found"
            ))),
            None => Ok(()),
        }
    }

    /// Attach loaded documents to the identity map.
    ///
    /// Each returned document carries the value callers should see: the
    /// tracked one when the key is already known, the loaded one otherwise.
    /// Documents staged for removal are dropped.
    pub(crate) fn attach(
        &self,
        collection: &str,
        docs: Vec<StoredDocument>,
    ) -> StoreResult<Vec<StoredDocument>> {
        let mut state = self.state()?;
        let mut visible = Vec::with_capacity(docs.len());
        for doc in docs {
            match state.known(collection, &doc.key) {
                Known::Removed => {}
                Known::Present(data) => visible.push(StoredDocument { key: doc.key, data }),
                Known::Unknown => {
                    state
                        .tracked
                        .insert((collection.to_string(), doc.key.clone()), doc.data.clone());
                    visible.push(doc);
                }
            }
        }
        Ok(visible)
    }

    /// Stage inserts. Nothing is staged if any key is already known.
    pub(crate) fn stage_inserts(
        &self,
        collection: &str,
        objects: Vec<(String, Value)>,
    ) -> StoreResult<()> {
        let mut state = self.state()?;

        let mut seen = HashSet::new();
        for (key, _) in &objects {
            let duplicate_in_batch = !seen.insert(key.as_str());
            if duplicate_in_batch || matches!(state.known(collection, key), Known::Present(_)) {
                return Err(StoreError::conflict(format!(
                    "{collection} {key} is already tracked"
                )));
            }
        }

        for (key, value) in objects {
            match state.pending_index(collection, &key) {
                // Remove-then-add of the same key replaces the stored object.
                Some(i) => state.pending[i].kind = ChangeKind::Update(value.clone()),
                None => state.pending.push(PendingChange {
                    collection: collection.to_string(),
                    key: key.clone(),
                    kind: ChangeKind::Insert(value.clone()),
                }),
            }
            debug!(collection, key = %key, "Staged insert");
            state.tracked.insert((collection.to_string(), key), value);
        }
        Ok(())
    }

    /// Stage an update, folding it into an already staged insert or update.
    pub(crate) fn stage_update(
        &self,
        collection: &str,
        key: String,
        value: Value,
    ) -> StoreResult<()> {
        let mut state = self.state()?;

        match state.pending_index(collection, &key) {
            Some(i) => match &mut state.pending[i].kind {
                ChangeKind::Delete => {
                    return Err(StoreError::not_found(format!(
                        "{collection} {key} is staged for removal"
                    )));
                }
                ChangeKind::Insert(staged) | ChangeKind::Update(staged) => {
                    *staged = value.clone();
                }
            },
            None => state.pending.push(PendingChange {
                collection: collection.to_string(),
                key: key.clone(),
                kind: ChangeKind::Update(value.clone()),
            }),
        }

        debug!(collection, key = %key, "Staged update");
        state.tracked.insert((collection.to_string(), key), value);
        Ok(())
    }

    /// Keys the session cannot vouch for and must be checked against the
    /// backend before removal. Fails if any key is already staged for
    /// removal.
    pub(crate) fn unverified_keys(
        &self,
        collection: &str,
        keys: &[String],
    ) -> StoreResult<Vec<String>> {
        let state = self.state()?;
        let mut unverified = Vec::new();
        for key in keys {
            match state.known(collection, key) {
                Known::Removed => {
                    return Err(StoreError::not_found(format!(
                        "{collection} {key} is already staged for removal"
                    )));
                }
                Known::Unknown => unverified.push(key.clone()),
                Known::Present(_) => {}
            }
        }
        Ok(unverified)
    }

    /// Stage removals of keys that are known to exist.
    ///
    /// A staged insert is simply dropped; a staged update becomes a delete.
    pub(crate) fn stage_deletes(&self, collection: &str, keys: &[String]) -> StoreResult<()> {
        let mut state = self.state()?;
        for key in keys {
            match state.pending_index(collection, key) {
                Some(i) if matches!(state.pending[i].kind, ChangeKind::Insert(_)) => {
                    state.pending.remove(i);
                }
                Some(i) => state.pending[i].kind = ChangeKind::Delete,
                None => state.pending.push(PendingChange {
                    collection: collection.to_string(),
                    key: key.clone(),
                    kind: ChangeKind::Delete,
                }),
            }
            state.tracked.remove(&(collection.to_string(), key.clone()));
            debug!(collection, key = %key, "Staged removal");
        }
        Ok(())
    }
}
