//! Connectivity check.

use serde::Serialize;

use crate::output::{self, OutputFormat};
use pstore_core::config::StoreConfig;
use pstore_core::error::StoreError;
use pstore_core::traits::StorageBackend;
use pstore_database::connection::mask_password;

#[derive(Debug, Serialize)]
struct HealthReport {
    database: String,
    healthy: bool,
}

/// Run the backend health check and report the outcome
pub async fn execute(config: &StoreConfig, format: OutputFormat) -> Result<(), StoreError> {
    let backend = super::backend(config).await?;
    let report = HealthReport {
        database: mask_password(&config.database.url),
        healthy: backend.health_check().await?,
    };

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            output::print_kv("Database", &report.database);
            output::print_kv("Healthy", if report.healthy { "yes" } else { "no" });
        }
    }

    if report.healthy {
        Ok(())
    } else {
        Err(StoreError::database("Database health check failed"))
    }
}
