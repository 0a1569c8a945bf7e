//! In-memory storage backend for tests and development.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use pstore_core::error::StoreError;
use pstore_core::result::StoreResult;
use pstore_core::traits::StorageBackend;
use pstore_core::types::{ChangeKind, Criteria, PendingChange, SelectQuery, StoredDocument};

use super::eval;

type Collections = HashMap<String, BTreeMap<String, Value>>;

/// Storage backend that keeps every collection in process memory.
///
/// Clones share the same data. A change set is checked in full before any
/// of it is written, so a failed commit leaves the data untouched.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> StoreResult<usize> {
        Ok(self.read()?.get(collection).map_or(0, BTreeMap::len))
    }

    /// Whether a collection holds no documents.
    pub fn is_empty(&self, collection: &str) -> StoreResult<bool> {
        Ok(self.len(collection)? == 0)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Collections>> {
        self.collections
            .read()
            .map_err(|_| StoreError::internal("memory backend lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Collections>> {
        self.collections
            .write()
            .map_err(|_| StoreError::internal("memory backend lock poisoned"))
    }

    fn matching(&self, collection: &str, criteria: &Criteria) -> StoreResult<Vec<StoredDocument>> {
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, data)| eval::matches(criteria, data))
                    .map(|(key, data)| StoredDocument {
                        key: key.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Check a change set against the current data without writing anything.
fn check(collections: &Collections, changes: &[PendingChange]) -> StoreResult<()> {
    let mut overlay: HashMap<(&str, &str), bool> = HashMap::new();

    for change in changes {
        let slot = (change.collection.as_str(), change.key.as_str());
        let present = overlay.get(&slot).copied().unwrap_or_else(|| {
            collections
                .get(&change.collection)
                .is_some_and(|docs| docs.contains_key(&change.key))
        });

        match (&change.kind, present) {
            (ChangeKind::Insert(_), true) => {
                return Err(StoreError::conflict(format!(
                    "{} {} already exists",
                    change.collection, change.key
                )));
            }
            (ChangeKind::Update(_) | ChangeKind::Delete, false) => {
                return Err(StoreError::not_found(format!(
                    "{} {} not found",
                    change.collection, change.key
                )));
            }
            _ => {}
        }
        overlay.insert(slot, !matches!(change.kind, ChangeKind::Delete));
    }
    Ok(())
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn fetch(
        &self,
        collection: &str,
        query: &SelectQuery,
    ) -> StoreResult<Vec<StoredDocument>> {
        let mut docs = self.matching(collection, &query.criteria)?;
        if !query.sort.is_empty() {
            docs.sort_by(|a, b| eval::compare_documents(a, b, &query.sort));
        }

        let window = docs
            .into_iter()
            .skip(usize::try_from(query.offset).unwrap_or(usize::MAX));
        Ok(match query.limit {
            Some(limit) => window
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect(),
            None => window.collect(),
        })
    }

    async fn count(&self, collection: &str, criteria: &Criteria) -> StoreResult<u64> {
        Ok(self.matching(collection, criteria)?.len() as u64)
    }

    async fn count_keys(
        &self,
        collection: &str,
        criteria: &Criteria,
        keys: &[String],
    ) -> StoreResult<u64> {
        let keys: HashSet<&str> = keys.iter().map(String::as_str).collect();
        let collections = self.read()?;
        Ok(collections.get(collection).map_or(0, |docs| {
            docs.iter()
                .filter(|(key, data)| keys.contains(key.as_str()) && eval::matches(criteria, data))
                .count() as u64
        }))
    }

    async fn fetch_by_keys(
        &self,
        collection: &str,
        keys: &[String],
    ) -> StoreResult<Vec<StoredDocument>> {
        let collections = self.read()?;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut found: Vec<StoredDocument> = keys
            .iter()
            .filter_map(|key| {
                docs.get(key).map(|data| StoredDocument {
                    key: key.clone(),
                    data: data.clone(),
                })
            })
            .collect();
        found.sort_by(|a, b| a.key.cmp(&b.key));
        found.dedup_by(|a, b| a.key == b.key);
        Ok(found)
    }

    async fn apply(&self, changes: &[PendingChange]) -> StoreResult<()> {
        let mut collections = self.write()?;
        check(&collections, changes)?;

        for change in changes {
            debug!(
                collection = %change.collection,
                key = %change.key,
                change = change.verb(),
                "Applying change"
            );
            let docs = collections.entry(change.collection.clone()).or_default();
            match &change.kind {
                ChangeKind::Insert(data) | ChangeKind::Update(data) => {
                    docs.insert(change.key.clone(), data.clone());
                }
                ChangeKind::Delete => {
                    docs.remove(&change.key);
                }
            }
        }

        debug!(changes = changes.len(), "Applied change set in memory");
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pstore_core::error::ErrorKind;
    use pstore_core::types::{FilterField, SortField};
    use serde_json::json;

    fn insert(key: &str, data: Value) -> PendingChange {
        PendingChange {
            collection: "people".into(),
            key: key.to_string(),
            kind: ChangeKind::Insert(data),
        }
    }

    async fn seeded() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend
            .apply(&[
                insert("1", json!({"name": "Ada", "age": 36})),
                insert("2", json!({"name": "Grace", "age": 85})),
                insert("3", json!({"name": "Alan", "age": 41})),
            ])
            .await
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn test_fetch_filter_sort_window() {
        let backend = seeded().await;
        let query = SelectQuery {
            criteria: FilterField::gt("age", 40).into(),
            sort: vec![SortField::desc("age")],
            offset: 1,
            limit: Some(5),
        };
        let docs = backend.fetch("people", &query).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].key, "3");
        assert_eq!(backend.count("people", &query.criteria).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_count_keys() {
        let backend = seeded().await;
        let keys = vec!["1".to_string(), "2".to_string(), "9".to_string()];
        assert_eq!(backend.count_keys("people", &Criteria::All, &keys).await.unwrap(), 2);
        let older = Criteria::from(FilterField::gt("age", 40));
        assert_eq!(backend.count_keys("people", &older, &keys).await.unwrap(), 1);
        assert_eq!(backend.count_keys("nobody", &older, &keys).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_huge_window_is_not_an_error() {
        let backend = seeded().await;
        let everything = SelectQuery {
            limit: Some(u64::MAX),
            ..SelectQuery::default()
        };
        assert_eq!(backend.fetch("people", &everything).await.unwrap().len(), 3);
        let beyond = SelectQuery {
            offset: u64::MAX,
            ..SelectQuery::default()
        };
        assert!(backend.fetch("people", &beyond).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_by_keys_skips_missing() {
        let backend = seeded().await;
        let keys = vec!["3".to_string(), "9".to_string(), "1".to_string()];
        let docs = backend.fetch_by_keys("people", &keys).await.unwrap();
        assert_eq!(docs.iter().map(|d| d.key.as_str()).collect::<Vec<_>>(), ["1", "3"]);
        assert!(backend.fetch_by_keys("nobody", &keys).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_is_all_or_nothing() {
        let backend = seeded().await;
        let err = backend
            .apply(&[
                insert("4", json!({"name": "Edsger"})),
                insert("1", json!({"name": "Dup"})),
            ])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(backend.len("people").unwrap(), 3);

        let err = backend
            .apply(&[PendingChange {
                collection: "people".into(),
                key: "42".into(),
                kind: ChangeKind::Update(json!({})),
            }])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_then_insert_same_key() {
        let backend = seeded().await;
        backend
            .apply(&[
                PendingChange {
                    collection: "people".into(),
                    key: "1".into(),
                    kind: ChangeKind::Delete,
                },
                insert("1", json!({"name": "Ada II"})),
            ])
            .await
            .unwrap();
        let docs = backend.fetch_by_keys("people", &["1".to_string()]).await.unwrap();
        assert_eq!(docs[0].data["name"], "Ada II");
    }
}
