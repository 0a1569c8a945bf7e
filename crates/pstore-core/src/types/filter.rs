//! Filter types for criteria over object fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Exact equality.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// SQL `LIKE` pattern match (`%` and `_` wildcards).
    Like,
    /// Case-insensitive `LIKE`.
    #[serde(rename = "ilike")]
    ILike,
    /// List membership.
    In,
    /// Field is absent or null.
    IsNull,
    /// Field is present and not null.
    IsNotNull,
}

impl FilterOp {
    /// Whether this operator orders or equates two values.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Gt | Self::Gte | Self::Lt | Self::Lte
        )
    }
}

/// A dynamic filter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A string value.
    String(String),
    /// An integer value.
    Integer(i64),
    /// A floating-point value.
    Float(f64),
    /// A boolean value.
    Boolean(bool),
    /// A list of values (for the `In` operator).
    List(Vec<FilterValue>),
    /// Null / no value (for `IsNull`, `IsNotNull`).
    Null,
}

impl FilterValue {
    /// The JSON representation compared against stored documents.
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::Boolean(b) => Value::Bool(*b),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Null => Value::Null,
        }
    }

    fn is_scalar(&self) -> bool {
        !matches!(self, Self::List(_) | Self::Null)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<uuid::Uuid> for FilterValue {
    fn from(value: uuid::Uuid) -> Self {
        Self::String(value.to_string())
    }
}

impl<V: Into<FilterValue>> From<Vec<V>> for FilterValue {
    fn from(values: Vec<V>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// A single filter condition on a named field.
///
/// `field` is a dotted path into the serialized object, e.g.
/// `"address.city"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterField {
    /// The field path to filter on.
    pub field: String,
    /// The comparison operator.
    pub op: FilterOp,
    /// The value to compare against.
    #[serde(default = "null_value")]
    pub value: FilterValue,
}

impl FilterField {
    /// Create a new filter field.
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Shorthand for an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    /// Shorthand for an inequality filter.
    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOp::Ne, value)
    }

    /// Shorthand for a greater-than filter.
    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOp::Gt, value)
    }

    /// Shorthand for a greater-than-or-equal filter.
    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOp::Gte, value)
    }

    /// Shorthand for a less-than filter.
    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOp::Lt, value)
    }

    /// Shorthand for a less-than-or-equal filter.
    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOp::Lte, value)
    }

    /// Shorthand for a `LIKE` filter.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Like, FilterValue::String(pattern.into()))
    }

    /// Shorthand for a case-insensitive `LIKE` filter.
    pub fn ilike(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOp::ILike, FilterValue::String(pattern.into()))
    }

    /// Shorthand for a list membership filter.
    pub fn is_in<V: Into<FilterValue>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Self::new(field, FilterOp::In, values)
    }

    /// Shorthand for an `IsNull` filter.
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOp::IsNull, FilterValue::Null)
    }

    /// Shorthand for an `IsNotNull` filter.
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOp::IsNotNull, FilterValue::Null)
    }

    /// The field path split into its segments.
    pub fn path(&self) -> Vec<String> {
        split_path(&self.field)
    }

    /// Check that the operator and value fit together.
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_path(&self.field)?;

        let ok = match self.op {
            FilterOp::IsNull | FilterOp::IsNotNull => self.value == FilterValue::Null,
            FilterOp::Like | FilterOp::ILike => matches!(self.value, FilterValue::String(_)),
            FilterOp::In => match &self.value {
                FilterValue::List(items) => items.iter().all(FilterValue::is_scalar),
                _ => false,
            },
            op => op.is_comparison() && self.value.is_scalar(),
        };

        if ok {
            Ok(())
        } else {
            Err(StoreError::validation(format!(
                "Operator {:?} cannot be applied to value {:?} on field '{}'",
                self.op, self.value, self.field
            )))
        }
    }
}

/// Split a dotted field path into segments.
pub fn split_path(field: &str) -> Vec<String> {
    field.split('.').map(str::to_string).collect()
}

/// Reject empty paths and empty segments such as `"a..b"`.
pub fn validate_path(field: &str) -> Result<(), StoreError> {
    if field.trim().is_empty() {
        return Err(StoreError::validation("Field path must not be empty"));
    }
    if field.split('.').any(|segment| segment.trim().is_empty()) {
        return Err(StoreError::validation(format!(
            "Field path '{field}' contains an empty segment"
        )));
    }
    Ok(())
}

fn null_value() -> FilterValue {
    FilterValue::Null
}
