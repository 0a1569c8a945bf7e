//! Admin command definitions and dispatch.

pub mod documents;
pub mod health;
pub mod migrate;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use pstore_core::config::StoreConfig;
use pstore_core::error::StoreError;
use pstore_database::{DatabasePool, PgBackend};

/// pstore-admin: inspect and maintain pstore document collections
#[derive(Debug, Parser)]
#[command(name = "pstore-admin", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Check database connectivity
    Health,
    /// Count documents in a collection
    Count(documents::CountArgs),
    /// List one page of documents
    List(documents::ListArgs),
    /// Show a single document
    Show(documents::ShowArgs),
    /// Remove documents by id
    Remove(documents::RemoveArgs),
}

impl Cli {
    /// Execute the selected command
    pub async fn execute(&self, config: &StoreConfig) -> Result<(), StoreError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, config).await,
            Commands::Health => health::execute(config, self.format).await,
            Commands::Count(args) => documents::count(args, config, self.format).await,
            Commands::List(args) => documents::list(args, config, self.format).await,
            Commands::Show(args) => documents::show(args, config, self.format).await,
            Commands::Remove(args) => documents::remove(args, config).await,
        }
    }
}

/// Helper: connect to the configured database
pub async fn connect(config: &StoreConfig) -> Result<DatabasePool, StoreError> {
    DatabasePool::connect(&config.database).await
}

/// Helper: a backend over the configured database
pub async fn backend(config: &StoreConfig) -> Result<PgBackend, StoreError> {
    Ok(PgBackend::from_database(&connect(config).await?))
}
