//! Schema migration commands.

use clap::{Args, Subcommand};

use crate::output;
use pstore_core::config::StoreConfig;
use pstore_core::error::StoreError;
use pstore_database::migration::run_migrations;

#[derive(Debug, Args)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub command: MigrateCommand,
}

#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Create or upgrade the persistent_objects table
    Run,
}

pub async fn execute(args: &MigrateArgs, config: &StoreConfig) -> Result<(), StoreError> {
    let database = super::connect(config).await?;
    let outcome = match args.command {
        MigrateCommand::Run => run_migrations(database.pool()).await,
    };
    database.close().await;

    outcome?;
    output::print_success("Schema is up to date.");
    Ok(())
}
