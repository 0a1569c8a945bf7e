//! The contract every stored entity fulfils.

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

use crate::types::key::StoreKey;

/// An entity that can be kept in a persistent store.
///
/// The identifier returned by [`id`](Self::id) must not change once the
/// object has been added, and must be unique within [`COLLECTION`](Self::COLLECTION).
/// Objects are validated with [`Validate`] before they are staged.
pub trait PersistentObject<K = Uuid>:
    Serialize + DeserializeOwned + Validate + Clone + Send + Sync + 'static
where
    K: StoreKey,
{
    /// Name of the backing collection.
    const COLLECTION: &'static str;

    /// The object's identifier.
    fn id(&self) -> &K;
}
