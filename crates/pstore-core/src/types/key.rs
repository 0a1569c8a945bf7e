//! Store keys and newtype key wrappers around [`uuid::Uuid`].
//!
//! Any type that is hashable, printable, and parseable can key a
//! collection. Backends persist keys in their `Display` form, so a key must
//! round-trip through `to_string` and `FromStr`. Domain code that wants
//! distinct identifier types per entity uses [`define_key!`].

use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;

/// Bound set required of a persistent object's identifier.
pub trait StoreKey:
    Clone + Eq + Hash + Debug + Display + FromStr + Send + Sync + 'static
{
    /// The textual form under which the key is persisted.
    fn to_storage_key(&self) -> String {
        self.to_string()
    }

    /// Parse a key from its persisted textual form.
    fn from_storage_key(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl<K> StoreKey for K where K: Clone + Eq + Hash + Debug + Display + FromStr + Send + Sync + 'static
{}

/// Define a newtype key wrapper around `Uuid`.
///
/// The generated type is `Copy`, serializes transparently, and satisfies
/// [`StoreKey`].
#[macro_export]
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Return the inner UUID value.
            pub fn into_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> uuid::Uuid {
                id.0
            }
        }
    };
}
