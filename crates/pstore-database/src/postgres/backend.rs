//! PostgreSQL storage backend.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use pstore_core::error::{ErrorKind, StoreError};
use pstore_core::result::StoreResult;
use pstore_core::traits::StorageBackend;
use pstore_core::types::{ChangeKind, Criteria, PendingChange, SelectQuery, StoredDocument};

use super::sql::{push_criteria, push_order_by};
use crate::connection::DatabasePool;

/// A row of the `persistent_objects` table.
#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    data: Value,
}

impl From<DocumentRow> for StoredDocument {
    fn from(row: DocumentRow) -> Self {
        Self {
            key: row.id,
            data: row.data,
        }
    }
}

/// `LIMIT`/`OFFSET` are BIGINT; larger windows are clamped.
fn to_bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn database_error(message: &str, err: sqlx::Error) -> StoreError {
    StoreError::with_source(ErrorKind::Database, message.to_string(), err)
}

/// Storage backend keeping documents in the `persistent_objects` table.
#[derive(Debug, Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    /// Create a backend over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a backend from a managed pool.
    pub fn from_database(database: &DatabasePool) -> Self {
        Self::new(database.pool().clone())
    }

    /// Return a reference to the underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn select_where<'a>(collection: &str, criteria: &Criteria, head: &str) -> QueryBuilder<'a, Postgres> {
        let mut builder = QueryBuilder::new(head);
        builder.push(" FROM persistent_objects WHERE collection = ");
        builder.push_bind(collection.to_string());
        if !criteria.is_all() {
            builder.push(" AND ");
            push_criteria(&mut builder, criteria);
        }
        builder
    }

    async fn apply_one(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        change: &PendingChange,
    ) -> StoreResult<()> {
        let result = match &change.kind {
            ChangeKind::Insert(data) => sqlx::query(
                "INSERT INTO persistent_objects (collection, id, data) VALUES ($1, $2, $3)",
            )
            .bind(&change.collection)
            .bind(&change.key)
            .bind(data)
            .execute(&mut **tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    StoreError::conflict(format!(
                        "{} {} already exists",
                        change.collection, change.key
                    ))
                }
                _ => database_error("Failed to insert document", e),
            })?,
            ChangeKind::Update(data) => sqlx::query(
                "UPDATE persistent_objects SET data = $3, updated_at = NOW() \
                 WHERE collection = $1 AND id = $2",
            )
            .bind(&change.collection)
            .bind(&change.key)
            .bind(data)
            .execute(&mut **tx)
            .await
            .map_err(|e| database_error("Failed to update document", e))?,
            ChangeKind::Delete => {
                sqlx::query("DELETE FROM persistent_objects WHERE collection = $1 AND id = $2")
                    .bind(&change.collection)
                    .bind(&change.key)
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| database_error("Failed to delete document", e))?
            }
        };

        if !matches!(change.kind, ChangeKind::Insert(_)) && result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!(
                "Cannot {} {} {}: not found",
                change.verb(),
                change.collection,
                change.key
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for PgBackend {
    async fn fetch(
        &self,
        collection: &str,
        query: &SelectQuery,
    ) -> StoreResult<Vec<StoredDocument>> {
        let mut builder = Self::select_where(collection, &query.criteria, "SELECT id, data");
        push_order_by(&mut builder, &query.sort);
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(to_bigint(limit));
        }
        if query.offset > 0 {
            builder.push(" OFFSET ");
            builder.push_bind(to_bigint(query.offset));
        }

        let rows = builder
            .build_query_as::<DocumentRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| database_error("Failed to fetch documents", e))?;

        debug!(collection, rows = rows.len(), "Fetched documents");
        Ok(rows.into_iter().map(StoredDocument::from).collect())
    }

    async fn count(&self, collection: &str, criteria: &Criteria) -> StoreResult<u64> {
        let mut builder = Self::select_where(collection, criteria, "SELECT COUNT(*)");
        let total: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| database_error("Failed to count documents", e))?;
        Ok(total as u64)
    }

    async fn count_keys(
        &self,
        collection: &str,
        criteria: &Criteria,
        keys: &[String],
    ) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut builder = Self::select_where(collection, criteria, "SELECT COUNT(*)");
        builder.push(" AND id = ANY(");
        builder.push_bind(keys.to_vec());
        builder.push(")");
        let total: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| database_error("Failed to count documents by key", e))?;
        Ok(total as u64)
    }

    async fn fetch_by_keys(
        &self,
        collection: &str,
        keys: &[String],
    ) -> StoreResult<Vec<StoredDocument>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, data FROM persistent_objects \
             WHERE collection = $1 AND id = ANY($2) ORDER BY id COLLATE \"C\" ASC",
        )
        .bind(collection)
        .bind(keys)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("Failed to fetch documents by key", e))?;

        Ok(rows.into_iter().map(StoredDocument::from).collect())
    }

    async fn apply(&self, changes: &[PendingChange]) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| database_error("Failed to begin transaction", e))?;

        for change in changes {
            debug!(
                collection = %change.collection,
                key = %change.key,
                change = change.verb(),
                "Applying change"
            );
            // Dropping `tx` on error rolls the whole change set back.
            Self::apply_one(&mut tx, change).await?;
        }

        tx.commit()
            .await
            .map_err(|e| database_error("Failed to commit transaction", e))?;

        info!(changes = changes.len(), "Committed change set");
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| database_error("Health check failed", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds_clamp_to_bigint() {
        assert_eq!(to_bigint(0), 0);
        assert_eq!(to_bigint(25), 25);
        assert_eq!(to_bigint(i64::MAX as u64), i64::MAX);
        assert_eq!(to_bigint(u64::MAX), i64::MAX);
    }
}
