//! Store configuration schemas.
//!
//! Configuration is deserialized from an optional TOML file merged with
//! `PSTORE__`-prefixed environment variables via the `config` crate.

pub mod database;
pub mod logging;
pub mod paging;

use serde::{Deserialize, Serialize};

pub use self::database::DatabaseConfig;
pub use self::logging::{LogFormat, LoggingConfig};
pub use self::paging::PagingConfig;

use crate::error::StoreError;

/// Everything `pstore-admin` and embedding applications read at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub database: DatabaseConfig,
    /// Paging limits applied to paged queries.
    #[serde(default)]
    pub paging: PagingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StoreConfig {
    /// Load configuration from a TOML file and the environment.
    ///
    /// The file is optional; variables such as `PSTORE__DATABASE__URL`
    /// override its values.
    pub fn load(path: &str) -> Result<Self, StoreError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("PSTORE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let parsed: Self = config.try_deserialize()?;
        parsed.database.validate()?;
        parsed.paging.validate()?;
        Ok(parsed)
    }
}
