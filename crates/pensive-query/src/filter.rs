//! Structured field filters.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use pensive_core::{value_to_text, Fields};

/// Filter operator and operand.
///
/// Matching is deliberately lenient: operand/value pairings that cannot
/// be compared are treated as "no match" rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "lowercase")]
pub enum FilterOp {
    /// Exact value equality.
    Eq(Value),

    /// Value inequality. Also matches when the field is absent.
    Ne(Value),

    /// Greater-than. Numbers compare numerically, strings
    /// lexicographically; mixed types never match.
    Gt(Value),

    /// Less-than, with the same comparison rules as `Gt`.
    Lt(Value),

    /// Substring membership: matches if any candidate occurs
    /// case-insensitively within the string form of the field value.
    In(Vec<String>),
}

/// A single filter applied to one document field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    /// Field name to test.
    pub field: String,

    /// Operator and operand.
    #[serde(flatten)]
    pub op: FilterOp,
}

impl Filter {
    /// Evaluate this filter against a document's fields.
    pub fn matches(&self, fields: &Fields) -> bool {
        let value = fields.get(&self.field);

        match &self.op {
            FilterOp::Eq(want) => value == Some(want),
            FilterOp::Ne(want) => value != Some(want),
            FilterOp::Gt(want) => {
                value.and_then(|v| compare_values(v, want)) == Some(Ordering::Greater)
            }
            FilterOp::Lt(want) => {
                value.and_then(|v| compare_values(v, want)) == Some(Ordering::Less)
            }
            FilterOp::In(candidates) => value.is_some_and(|v| {
                let haystack = value_to_text(v).to_lowercase();
                candidates
                    .iter()
                    .any(|c| haystack.contains(&c.to_lowercase()))
            }),
        }
    }
}

/// Evaluate a filter conjunction: every filter must match.
pub fn matches_all(filters: &[Filter], fields: &Fields) -> bool {
    filters.iter().all(|f| f.matches(fields))
}

/// Order two JSON values when they are comparable: numbers numerically,
/// strings lexicographically. Anything else is incomparable.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.as_str().cmp(y.as_str())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn filter(field: &str, op: FilterOp) -> Filter {
        Filter {
            field: field.to_string(),
            op,
        }
    }

    #[test]
    fn test_eq_ne() {
        let f = fields(&[("status", json!("open"))]);

        assert!(filter("status", FilterOp::Eq(json!("open"))).matches(&f));
        assert!(!filter("status", FilterOp::Eq(json!("closed"))).matches(&f));
        assert!(filter("status", FilterOp::Ne(json!("closed"))).matches(&f));
        assert!(!filter("status", FilterOp::Ne(json!("open"))).matches(&f));
    }

    #[test]
    fn test_missing_field() {
        let f = fields(&[]);

        assert!(!filter("x", FilterOp::Eq(json!(1))).matches(&f));
        assert!(filter("x", FilterOp::Ne(json!(1))).matches(&f));
        assert!(!filter("x", FilterOp::Gt(json!(1))).matches(&f));
        assert!(!filter("x", FilterOp::In(vec!["a".into()])).matches(&f));
    }

    #[test]
    fn test_numeric_comparison() {
        let f = fields(&[("pages", json!(10))]);

        assert!(filter("pages", FilterOp::Gt(json!(5))).matches(&f));
        assert!(!filter("pages", FilterOp::Gt(json!(10))).matches(&f));
        assert!(filter("pages", FilterOp::Lt(json!(10.5))).matches(&f));
    }

    #[test]
    fn test_string_comparison() {
        let f = fields(&[("name", json!("beta"))]);

        assert!(filter("name", FilterOp::Gt(json!("alpha"))).matches(&f));
        assert!(filter("name", FilterOp::Lt(json!("gamma"))).matches(&f));
    }

    #[test]
    fn test_mixed_types_never_match() {
        let f = fields(&[("pages", json!(10))]);

        assert!(!filter("pages", FilterOp::Gt(json!("5"))).matches(&f));
        assert!(!filter("pages", FilterOp::Lt(json!("50"))).matches(&f));
    }

    #[test]
    fn test_in_substring_case_insensitive() {
        let f = fields(&[("content", json!("The Quick Brown Fox"))]);

        assert!(filter("content", FilterOp::In(vec!["quick".into()])).matches(&f));
        assert!(filter(
            "content",
            FilterOp::In(vec!["missing".into(), "FOX".into()])
        )
        .matches(&f));
        assert!(!filter("content", FilterOp::In(vec!["dog".into()])).matches(&f));
    }

    #[test]
    fn test_in_against_non_string_value() {
        let f = fields(&[("pages", json!(1234))]);
        assert!(filter("pages", FilterOp::In(vec!["23".into()])).matches(&f));
    }

    #[test]
    fn test_matches_all_conjunction() {
        let f = fields(&[("status", json!("open")), ("pages", json!(10))]);

        let filters = vec![
            filter("status", FilterOp::Eq(json!("open"))),
            filter("pages", FilterOp::Gt(json!(5))),
        ];
        assert!(matches_all(&filters, &f));

        let filters = vec![
            filter("status", FilterOp::Eq(json!("open"))),
            filter("pages", FilterOp::Gt(json!(50))),
        ];
        assert!(!matches_all(&filters, &f));
    }

    #[test]
    fn test_filter_serde_shape() {
        let f: Filter =
            serde_json::from_str(r#"{"field":"content","op":"in","value":["rust","db"]}"#)
                .unwrap();
        assert_eq!(f.field, "content");
        assert!(matches!(f.op, FilterOp::In(ref v) if v.len() == 2));
    }
}
