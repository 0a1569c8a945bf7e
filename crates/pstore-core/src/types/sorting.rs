//! Sort keys. Backends always break remaining ties by object key.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::filter::{split_path, validate_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One sort key: a dotted document path and a direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortField {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    /// The field path split into its segments.
    pub fn path(&self) -> Vec<String> {
        split_path(&self.field)
    }

    /// Reject malformed field paths.
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_path(&self.field)
    }
}

/// Parses `field`, `field:asc`, or `field:desc`.
impl FromStr for SortField {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.rsplit_once(':') {
            Some((field, "asc")) => (field, SortDirection::Asc),
            Some((field, "desc")) => (field, SortDirection::Desc),
            Some((_, other)) => {
                return Err(StoreError::validation(format!(
                    "Unknown sort direction '{other}'"
                )));
            }
            None => (s, SortDirection::Asc),
        };
        let sort = Self::new(field, direction);
        sort.validate()?;
        Ok(sort)
    }
}
