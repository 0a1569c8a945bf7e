//! Unified error types for the persistent store.
//!
//! Backends map their driver errors into [`StoreError`] so that callers see
//! one taxonomy regardless of where the data lives.

use std::fmt;
use thiserror::Error;

/// What went wrong, independent of the backend that reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// No object with the requested key, or a staged change targets a
    /// missing row.
    NotFound,
    /// A conflict occurred (duplicate key, object already tracked).
    Conflict,
    /// Object, criteria, or query validation failed.
    Validation,
    /// A single-result lookup matched zero or more than one object.
    Cardinality,
    /// The backing database reported an error.
    Database,
    /// An object could not be converted to or from JSON.
    Serialization,
    /// Settings are missing or inconsistent.
    Configuration,
    /// A bug or poisoned lock inside the store.
    Internal,
}

impl ErrorKind {
    /// Stable upper-case name, as shown in error messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Validation => "VALIDATION",
            Self::Cardinality => "CARDINALITY",
            Self::Database => "DATABASE",
            Self::Serialization => "SERIALIZATION",
            Self::Configuration => "CONFIGURATION",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every fallible store operation.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct StoreError {
    pub kind: ErrorKind,
    /// Message for humans; never parsed.
    pub message: String,
    /// Driver or parser error this one wraps.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    /// An error without an underlying cause.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// An error wrapping the driver or parser error that caused it.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// A single-object lookup matched `matched` objects instead of one.
    pub fn cardinality(collection: &str, matched: usize) -> Self {
        let found = if matched > 1 {
            "more than one".to_string()
        } else {
            matched.to_string()
        };
        Self::new(
            ErrorKind::Cardinality,
            format!("Expected exactly one '{collection}' object, found {found}"),
        )
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether this error has the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Clone for StoreError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON conversion failed: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for StoreError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Invalid configuration: {err}"),
            err,
        )
    }
}

impl From<validator::ValidationErrors> for StoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::with_source(
            ErrorKind::Validation,
            format!("Object validation failed: {err}"),
            err,
        )
    }
}
