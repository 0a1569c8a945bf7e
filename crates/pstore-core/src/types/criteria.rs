//! Composable boolean criteria over persistent object fields.
//!
//! A [`Criteria`] tree is backend-neutral: each storage backend translates
//! it into its own filter (SQL for PostgreSQL, direct evaluation for the
//! in-memory backend).

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::filter::FilterField;

/// A boolean expression over object fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Criteria {
    /// Matches every object.
    #[default]
    All,
    /// A single field condition.
    Field(FilterField),
    /// Every child must match.
    And(Vec<Criteria>),
    /// At least one child must match.
    Or(Vec<Criteria>),
    /// The child must not match.
    Not(Box<Criteria>),
}

impl Criteria {
    /// Combine with another criteria so that both must match.
    ///
    /// `All` is the identity and nested `And`s are flattened.
    pub fn and(self, other: impl Into<Criteria>) -> Criteria {
        match (self, other.into()) {
            (Criteria::All, rhs) => rhs,
            (lhs, Criteria::All) => lhs,
            (Criteria::And(mut left), Criteria::And(right)) => {
                left.extend(right);
                Criteria::And(left)
            }
            (Criteria::And(mut left), rhs) => {
                left.push(rhs);
                Criteria::And(left)
            }
            (lhs, rhs) => Criteria::And(vec![lhs, rhs]),
        }
    }

    /// Combine with another criteria so that either may match.
    pub fn or(self, other: impl Into<Criteria>) -> Criteria {
        match (self, other.into()) {
            (Criteria::All, _) | (_, Criteria::All) => Criteria::All,
            (Criteria::Or(mut left), rhs) => {
                left.push(rhs);
                Criteria::Or(left)
            }
            (lhs, rhs) => Criteria::Or(vec![lhs, rhs]),
        }
    }

    /// Negate this criteria.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Criteria {
        Criteria::Not(Box::new(self))
    }

    /// Whether this criteria matches everything.
    pub fn is_all(&self) -> bool {
        matches!(self, Criteria::All)
    }

    /// Check the tree for malformed nodes.
    pub fn validate(&self) -> Result<(), StoreError> {
        match self {
            Criteria::All => Ok(()),
            Criteria::Field(field) => field.validate(),
            Criteria::And(children) | Criteria::Or(children) => {
                if children.is_empty() {
                    return Err(StoreError::validation(
                        "Criteria groups must contain at least one condition",
                    ));
                }
                children.iter().try_for_each(Criteria::validate)
            }
            Criteria::Not(inner) => inner.validate(),
        }
    }
}

impl From<FilterField> for Criteria {
    fn from(field: FilterField) -> Self {
        Criteria::Field(field)
    }
}

/// A domain-level criteria object.
///
/// Application code can define named criteria types (for example
/// `ActiveCustomers { since }`) and hand them to a store; the store only
/// sees the [`Criteria`] they produce.
pub trait Criterion: Send + Sync {
    /// The criteria tree this object stands for.
    fn criteria(&self) -> Criteria;
}

impl Criterion for Criteria {
    fn criteria(&self) -> Criteria {
        self.clone()
    }
}

impl Criterion for FilterField {
    fn criteria(&self) -> Criteria {
        Criteria::Field(self.clone())
    }
}
