//! In-memory backend.

mod backend;
pub mod eval;

pub use backend::MemoryBackend;
