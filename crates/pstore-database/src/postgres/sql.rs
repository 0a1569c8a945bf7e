//! Translation of criteria and sort keys into PostgreSQL.
//!
//! Documents live in a `data JSONB` column. Field paths and values are
//! always bound as parameters (`data #> $n` with a `TEXT[]` path), never
//! spliced into the statement text.

use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};

use pstore_core::types::{Criteria, FilterField, FilterOp, SortField};

/// Append a boolean SQL expression equivalent to `criteria`.
///
/// Each field condition is wrapped in `COALESCE(.., FALSE)` so that a
/// missing path yields `FALSE` rather than `NULL`, which keeps `NOT`
/// two-valued.
pub fn push_criteria(builder: &mut QueryBuilder<'_, Postgres>, criteria: &Criteria) {
    match criteria {
        Criteria::All => {
            builder.push("TRUE");
        }
        Criteria::Field(field) => {
            builder.push("COALESCE((");
            push_field(builder, field);
            builder.push("), FALSE)");
        }
        Criteria::And(children) => push_group(builder, children, " AND "),
        Criteria::Or(children) => push_group(builder, children, " OR "),
        Criteria::Not(inner) => {
            builder.push("NOT (");
            push_criteria(builder, inner);
            builder.push(")");
        }
    }
}

fn push_group(builder: &mut QueryBuilder<'_, Postgres>, children: &[Criteria], joiner: &str) {
    builder.push("(");
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            builder.push(joiner);
        }
        push_criteria(builder, child);
    }
    builder.push(")");
}

fn push_field(builder: &mut QueryBuilder<'_, Postgres>, field: &FilterField) {
    let path = field.path();

    match field.op {
        FilterOp::IsNull | FilterOp::IsNotNull => {
            builder.push("COALESCE(data #> ");
            builder.push_bind(path);
            builder.push(", 'null'::jsonb) ");
            builder.push(if field.op == FilterOp::IsNull { "=" } else { "<>" });
            builder.push(" 'null'::jsonb");
        }
        FilterOp::Like | FilterOp::ILike => {
            builder.push("data #>> ");
            builder.push_bind(path);
            builder.push(if field.op == FilterOp::Like {
                " LIKE "
            } else {
                " ILIKE "
            });
            builder.push_bind(text_of(field.value.to_json()));
        }
        FilterOp::In => {
            builder.push("data #> ");
            builder.push_bind(path);
            builder.push(" IN (SELECT value FROM jsonb_array_elements(");
            builder.push_bind(field.value.to_json());
            builder.push("))");
        }
        op => {
            builder.push("data #> ");
            builder.push_bind(path);
            builder.push(comparison_operator(op));
            builder.push_bind(field.value.to_json());
        }
    }
}

fn comparison_operator(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Ne => " <> ",
        FilterOp::Gt => " > ",
        FilterOp::Gte => " >= ",
        FilterOp::Lt => " < ",
        FilterOp::Lte => " <= ",
        _ => " = ",
    }
}

fn text_of(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Append `ORDER BY`, ending with the key as tie-breaker.
pub fn push_order_by(builder: &mut QueryBuilder<'_, Postgres>, sort: &[SortField]) {
    builder.push(" ORDER BY ");
    for field in sort {
        builder.push("data #> ");
        builder.push_bind(field.path());
        builder.push(" ");
        builder.push(field.direction.as_sql());
        builder.push(", ");
    }
    builder.push("id COLLATE \"C\" ASC");
}
