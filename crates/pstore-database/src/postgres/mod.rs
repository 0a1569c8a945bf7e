//! PostgreSQL backend.

mod backend;
pub mod sql;

pub use backend::PgBackend;
