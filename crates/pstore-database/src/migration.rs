//! Bootstrap schema for the documents table.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use pstore_core::error::{ErrorKind, StoreError};
use pstore_core::result::StoreResult;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Bring the `persistent_objects` schema up to date.
pub async fn run_migrations(pool: &PgPool) -> StoreResult<()> {
    MIGRATOR.run(pool).await.map_err(|e| {
        StoreError::with_source(ErrorKind::Database, "Schema migration failed", e)
    })?;

    info!(migrations = MIGRATOR.iter().count(), "Schema up to date");
    Ok(())
}
