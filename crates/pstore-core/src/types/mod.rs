//! Core type definitions shared by stores and backends.

pub mod criteria;
pub mod document;
pub mod filter;
pub mod key;
pub mod pagination;
pub mod query;
pub mod sorting;

pub use criteria::{Criteria, Criterion};
pub use document::{ChangeKind, PendingChange, StoredDocument};
pub use filter::{FilterField, FilterOp, FilterValue};
pub use key::StoreKey;
pub use pagination::{PageRequest, PagerList};
pub use query::{QueryBase, SelectQuery, Tracking};
pub use sorting::{SortDirection, SortField};
