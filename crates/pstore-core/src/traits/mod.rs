//! Core traits defined in `pstore-core` and implemented by `pstore-database`.

pub mod backend;
pub mod persistent_object;
pub mod queryable;
pub mod store;

pub use backend::StorageBackend;
pub use persistent_object::PersistentObject;
pub use queryable::{QuerySource, Queryable};
pub use store::PersistentStore;
