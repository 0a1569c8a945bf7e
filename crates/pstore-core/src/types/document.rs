//! Untyped documents exchanged between stores and backends.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A persisted object in its serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// The object key in its persisted textual form.
    pub key: String,
    /// The serialized object.
    pub data: Value,
}

/// The kind of a staged change.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeKind {
    /// Insert a new document; fails on a duplicate key.
    Insert(Value),
    /// Replace an existing document; fails when it is missing.
    Update(Value),
    /// Delete an existing document.
    Delete,
}

/// A change staged by a unit of work, applied on commit.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    /// Collection the document belongs to.
    pub collection: String,
    /// Document key.
    pub key: String,
    /// What to do.
    pub kind: ChangeKind,
}

impl PendingChange {
    /// Short label used in logs and errors.
    pub fn verb(&self) -> &'static str {
        match self.kind {
            ChangeKind::Insert(_) => "insert",
            ChangeKind::Update(_) => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb() {
        let change = |kind| PendingChange {
            collection: "people".into(),
            key: "1".into(),
            kind,
        };
        assert_eq!(change(ChangeKind::Insert(Value::Null)).verb(), "insert");
        assert_eq!(change(ChangeKind::Update(Value::Null)).verb(), "update");
        assert_eq!(change(ChangeKind::Delete).verb(), "delete");
    }
}
