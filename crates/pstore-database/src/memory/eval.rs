//! Criteria evaluation and ordering over JSON documents.
//!
//! The rules follow PostgreSQL's `jsonb` semantics so that the in-memory
//! backend and [`PgBackend`](crate::postgres::PgBackend) agree: values of
//! different JSON types order as `null < string < number < boolean < array <
//! object`, a missing path never satisfies a comparison, and a missing sort
//! key orders after every present value.

use std::cmp::Ordering;

use serde_json::Value;

use pstore_core::types::{Criteria, FilterField, FilterOp, SortDirection, SortField, StoredDocument};

/// Follow a field path into a document. Numeric segments index arrays.
pub fn resolve<'a>(doc: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Whether a document satisfies the criteria.
pub fn matches(criteria: &Criteria, doc: &Value) -> bool {
    match criteria {
        Criteria::All => true,
        Criteria::Field(field) => matches_field(field, doc),
        Criteria::And(children) => children.iter().all(|c| matches(c, doc)),
        Criteria::Or(children) => children.iter().any(|c| matches(c, doc)),
        Criteria::Not(inner) => !matches(inner, doc),
    }
}

fn matches_field(field: &FilterField, doc: &Value) -> bool {
    let target = resolve(doc, &field.path());

    match field.op {
        FilterOp::IsNull => target.is_none_or(Value::is_null),
        FilterOp::IsNotNull => target.is_some_and(|v| !v.is_null()),
        FilterOp::Like | FilterOp::ILike => {
            let (Some(text), Value::String(pattern)) = (target.and_then(as_text), field.value.to_json())
            else {
                return false;
            };
            like(&text, &pattern, field.op == FilterOp::ILike)
        }
        FilterOp::In => {
            let (Some(target), Value::Array(candidates)) = (target, field.value.to_json()) else {
                return false;
            };
            candidates
                .iter()
                .any(|c| compare_json(target, c) == Ordering::Equal)
        }
        op => {
            let Some(target) = target else {
                return false;
            };
            let ordering = compare_json(target, &field.value.to_json());
            match op {
                FilterOp::Eq => ordering == Ordering::Equal,
                FilterOp::Ne => ordering != Ordering::Equal,
                FilterOp::Gt => ordering == Ordering::Greater,
                FilterOp::Gte => ordering != Ordering::Less,
                FilterOp::Lt => ordering == Ordering::Less,
                FilterOp::Lte => ordering != Ordering::Greater,
                _ => false,
            }
        }
    }
}

/// Text form of a value, as PostgreSQL's `#>>` operator produces it.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values.
pub fn compare_json(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x.len().cmp(&y.len()).then_with(|| {
            x.iter()
                .zip(y)
                .map(|(l, r)| compare_json(l, r))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        }),
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()).then_with(|| {
            let mut left: Vec<_> = x.iter().collect();
            let mut right: Vec<_> = y.iter().collect();
            left.sort_by(|l, r| l.0.cmp(r.0));
            right.sort_by(|l, r| l.0.cmp(r.0));
            left.iter()
                .zip(&right)
                .map(|((lk, lv), (rk, rv))| lk.cmp(rk).then_with(|| compare_json(lv, rv)))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        }),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Order two documents by the sort keys, then by key.
pub fn compare_documents(a: &StoredDocument, b: &StoredDocument, sort: &[SortField]) -> Ordering {
    sort.iter()
        .map(|field| {
            let path = field.path();
            let ordering = match (resolve(&a.data, &path), resolve(&b.data, &path)) {
                (Some(x), Some(y)) => compare_json(x, y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            match field.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        })
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.key.cmp(&b.key))
}

/// One element of a compiled `LIKE` pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
enum LikeToken {
    /// `%`: any run of characters.
    Any,
    /// `_`: exactly one character.
    One,
    Char(char),
}

fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::Any,
            '_' => LikeToken::One,
            // A trailing backslash matches itself.
            '\\' => LikeToken::Char(chars.next().unwrap_or('\\')),
            c => LikeToken::Char(c),
        });
    }
    tokens
}

/// SQL `LIKE` matching with `%`, `_`, and `\` as escape character.
///
/// Runs in `O(text * pattern)`: on a mismatch only the most recent `%` is
/// retried, one character further along the text.
pub fn like(text: &str, pattern: &str, case_insensitive: bool) -> bool {
    let (text, pattern) = if case_insensitive {
        (text.to_lowercase(), pattern.to_lowercase())
    } else {
        (text.to_string(), pattern.to_string())
    };
    let text: Vec<char> = text.chars().collect();
    let tokens = like_tokens(&pattern);

    let (mut t, mut p) = (0, 0);
    // Token index after the last `%` and the text index it resumes from.
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        match tokens.get(p) {
            Some(LikeToken::Any) => {
                p += 1;
                backtrack = Some((p, t));
            }
            Some(LikeToken::One) => {
                t += 1;
                p += 1;
            }
            Some(LikeToken::Char(c)) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((resume, from)) => {
                    p = resume;
                    t = from + 1;
                    backtrack = Some((resume, t));
                }
                None => return false,
            },
        }
    }
    tokens[p..].iter().all(|token| *token == LikeToken::Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "name": "Ada Lovelace",
            "age": 36,
            "active": true,
            "nickname": null,
            "address": {"city": "London"},
            "tags": ["math", "poetry"]
        })
    }

    #[test]
    fn test_resolve_paths() {
        let d = doc();
        let path = |s: &str| s.split('.').map(str::to_string).collect::<Vec<_>>();
        assert_eq!(resolve(&d, &path("address.city")), Some(&json!("London")));
        assert_eq!(resolve(&d, &path("tags.1")), Some(&json!("poetry")));
        assert_eq!(resolve(&d, &path("address.zip")), None);
        assert_eq!(resolve(&d, &path("age.x")), None);
    }

    #[test]
    fn test_comparisons() {
        let d = doc();
        assert!(matches(&FilterField::eq("age", 36).into(), &d));
        assert!(matches(&FilterField::eq("age", 36.0).into(), &d));
        assert!(matches(&FilterField::gt("age", 30).into(), &d));
        assert!(!matches(&FilterField::lt("age", 30).into(), &d));
        assert!(matches(&FilterField::eq("active", true).into(), &d));
        assert!(matches(&FilterField::ne("name", "Grace").into(), &d));
        // missing fields never satisfy a comparison
        assert!(!matches(&FilterField::ne("missing", 1).into(), &d));
        // strings order before numbers
        assert!(matches(&FilterField::lt("name", 0).into(), &d));
    }

    #[test]
    fn test_null_checks() {
        let d = doc();
        assert!(matches(&FilterField::is_null("nickname").into(), &d));
        assert!(matches(&FilterField::is_null("missing").into(), &d));
        assert!(!matches(&FilterField::is_null("name").into(), &d));
        assert!(matches(&FilterField::is_not_null("name").into(), &d));
        assert!(!matches(&FilterField::is_not_null("nickname").into(), &d));
    }

    #[test]
    fn test_in_and_like() {
        let d = doc();
        assert!(matches(&FilterField::is_in("age", vec![1, 36]).into(), &d));
        assert!(!matches(&FilterField::is_in("age", Vec::<i64>::new()).into(), &d));
        assert!(matches(&FilterField::like("name", "Ada%").into(), &d));
        assert!(!matches(&FilterField::like("name", "ada%").into(), &d));
        assert!(matches(&FilterField::ilike("name", "ada%").into(), &d));
        assert!(matches(&FilterField::like("age", "3_").into(), &d));
    }

    #[test]
    fn test_boolean_composition() {
        let d = doc();
        let c = Criteria::from(FilterField::eq("address.city", "London"))
            .and(Criteria::from(FilterField::eq("active", false)).not());
        assert!(matches(&c, &d));
        let c = Criteria::from(FilterField::eq("age", 1)).or(FilterField::eq("age", 36));
        assert!(matches(&c, &d));
    }

    #[test]
    fn test_like_patterns() {
        assert!(like("abc", "a%c", false));
        assert!(like("ac", "a%c", false));
        assert!(!like("ab", "a_c", false));
        assert!(like("100%", "100\\%", false));
        assert!(!like("1000", "100\\%", false));
        assert!(like("ÉCOLE", "école", true));
        assert!(like("", "%", false));
        assert!(!like("", "_", false));
        assert!(like("abc", "%%c", false));
        assert!(like("a\\", "a\\", false));
    }

    #[test]
    fn test_like_many_wildcards_stays_linear() {
        let text = "a".repeat(2_000);
        assert!(!like(&text, "%a%a%a%a%a%a%a%a%a%a%b", false));
        assert!(like(&text, "%a%a%a%a%a%a%a%a%a%a%", false));
        assert!(like(&format!("{text}b"), "%a%a%a%a%a%a%a%a%a%a%b", false));
        assert!(!like(&text, "a%a%_%aab", true));
    }

    #[test]
    fn test_document_order_missing_last() {
        let a = StoredDocument { key: "a".into(), data: json!({"n": 2}) };
        let b = StoredDocument { key: "b".into(), data: json!({"n": 1}) };
        let c = StoredDocument { key: "c".into(), data: json!({}) };
        let asc = [SortField::asc("n")];
        let desc = [SortField::desc("n")];

        let mut docs = vec![a.clone(), b.clone(), c.clone()];
        docs.sort_by(|x, y| compare_documents(x, y, &asc));
        assert_eq!(docs.iter().map(|d| d.key.as_str()).collect::<Vec<_>>(), ["b", "a", "c"]);

        docs.sort_by(|x, y| compare_documents(x, y, &desc));
        assert_eq!(docs.iter().map(|d| d.key.as_str()).collect::<Vec<_>>(), ["c", "a", "b"]);

        docs.sort_by(|x, y| compare_documents(x, y, &[]));
        assert_eq!(docs.iter().map(|d| d.key.as_str()).collect::<Vec<_>>(), ["a", "b", "c"]);
    }
}
