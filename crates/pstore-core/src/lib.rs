//! # pstore-core
//!
//! The persistent store contract: the [`PersistentStore`] trait, the
//! [`PersistentObject`] and [`StorageBackend`] seams, criteria and query
//! descriptors, paging types, configuration schemas, and the unified error
//! type.
//!
//! This crate has **no** dependency on a database driver.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{ErrorKind, StoreError};
pub use result::StoreResult;
pub use traits::{PersistentObject, PersistentStore, QuerySource, Queryable, StorageBackend};
