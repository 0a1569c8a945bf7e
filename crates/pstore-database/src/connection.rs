//! Connection pool for the PostgreSQL backend.

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use pstore_core::config::DatabaseConfig;
use pstore_core::error::{ErrorKind, StoreError};
use pstore_core::result::StoreResult;

/// A configured sqlx pool. Clones share connections.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Open the pool and wait for the first connection.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let target = mask_password(&config.url);
        debug!(database = %target, "Opening PostgreSQL pool");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout())
            .idle_timeout(config.idle_timeout())
            .connect(&config.url)
            .await
            .map_err(|e| {
                StoreError::with_source(ErrorKind::Database, format!("Cannot reach {target}"), e)
            })?;

        info!(
            database = %target,
            max_connections = config.max_connections,
            "PostgreSQL pool ready"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Wait for checked-out connections to return, then close them all.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("PostgreSQL pool closed");
    }
}

/// Replace the password in a connection URL with `****`.
pub fn mask_password(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
        None => url.to_string(),
    }
}
