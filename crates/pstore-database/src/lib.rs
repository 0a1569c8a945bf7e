//! # pstore-database
//!
//! Storage backends and the unit-of-work implementation of
//! [`PersistentStore`](pstore_core::PersistentStore).
//!
//! The `postgres` feature provides [`PgBackend`] over a single JSONB
//! documents table; the `memory` feature provides [`MemoryBackend`] for
//! tests and development. Both are enabled by default.

pub mod blocking;
pub mod store;
pub mod unit_of_work;

#[cfg(feature = "postgres")]
pub mod connection;
#[cfg(feature = "postgres")]
pub mod migration;
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "memory")]
pub mod memory;

pub use blocking::{BlockingQuery, BlockingRuntime, BlockingStore};
pub use store::{DefaultStore, Store};
pub use unit_of_work::UnitOfWork;

#[cfg(feature = "postgres")]
pub use connection::DatabasePool;
#[cfg(feature = "postgres")]
pub use postgres::PgBackend;

#[cfg(feature = "memory")]
pub use memory::MemoryBackend;
