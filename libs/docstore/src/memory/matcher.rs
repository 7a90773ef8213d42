//! AST evaluation against in-memory documents.

use std::cmp::Ordering;

use query_core::{CompareOperator, Expr, SortDir, SortKey};
use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::store::{lookup, Document};

/// An [`Expr`] with its regexes compiled.
#[derive(Debug)]
pub(crate) enum Matcher {
    All,
    Compare {
        field: String,
        op: CompareOperator,
        value: Value,
    },
    In {
        field: String,
        values: Vec<Value>,
    },
    Regex {
        field: String,
        regex: Regex,
    },
    Exists {
        field: String,
        exists: bool,
    },
    And(Vec<Matcher>),
    Or(Vec<Matcher>),
    Not(Box<Matcher>),
}

impl Matcher {
    pub(crate) fn compile(expr: &Expr) -> StoreResult<Self> {
        Ok(match expr {
            Expr::All => Matcher::All,
            Expr::Compare { field, op, value } => Matcher::Compare {
                field: field.clone(),
                op: *op,
                value: value.clone(),
            },
            Expr::In { field, values } => Matcher::In {
                field: field.clone(),
                values: values.clone(),
            },
            Expr::NotIn { field, values } => Matcher::Not(Box::new(Matcher::In {
                field: field.clone(),
                values: values.clone(),
            })),
            Expr::Regex {
                field,
                pattern,
                options,
            } => Matcher::Regex {
                field: field.clone(),
                regex: build_regex(pattern, options)?,
            },
            Expr::Exists { field, exists } => Matcher::Exists {
                field: field.clone(),
                exists: *exists,
            },
            Expr::And(items) => Matcher::And(compile_all(items)?),
            Expr::Or(items) => Matcher::Or(compile_all(items)?),
            Expr::Not(inner) => Matcher::Not(Box::new(Matcher::compile(inner)?)),
        })
    }

    pub(crate) fn matches(&self, doc: &Document) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Compare { field, op, value } => {
                let actual = lookup(doc, field);
                match op {
                    CompareOperator::Eq => equals(actual, value),
                    CompareOperator::Ne => !equals(actual, value),
                    CompareOperator::Gt => ordered(actual, value, |o| o == Ordering::Greater),
                    CompareOperator::Ge => ordered(actual, value, |o| o != Ordering::Less),
                    CompareOperator::Lt => ordered(actual, value, |o| o == Ordering::Less),
                    CompareOperator::Le => ordered(actual, value, |o| o != Ordering::Greater),
                }
            }
            Matcher::In { field, values } => {
                let actual = lookup(doc, field);
                values.iter().any(|v| equals(actual, v))
            }
            Matcher::Regex { field, regex } => lookup(doc, field)
                .and_then(Value::as_str)
                .is_some_and(|s| regex.is_match(s)),
            Matcher::Exists { field, exists } => lookup(doc, field).is_some() == *exists,
            Matcher::And(items) => items.iter().all(|m| m.matches(doc)),
            Matcher::Or(items) => items.iter().any(|m| m.matches(doc)),
            Matcher::Not(inner) => !inner.matches(doc),
        }
    }
}

fn compile_all(items: &[Expr]) -> StoreResult<Vec<Matcher>> {
    items.iter().map(Matcher::compile).collect()
}

fn build_regex(pattern: &str, options: &str) -> StoreResult<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in options.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => return Err(StoreError::unsupported(format!("regex option '{other}'"))),
        };
    }
    builder
        .build()
        .map_err(|e| StoreError::unsupported(format!("invalid regex: {e}")))
}

/// `null` matches both a missing field and an explicit null. An array
/// matches when it equals `expected` or holds an element that does.
fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    let same = |v: &Value| compare_values(v, expected) == Some(Ordering::Equal);
    match actual {
        None => expected.is_null(),
        Some(a) => same(a) || a.as_array().is_some_and(|items| items.iter().any(same)),
    }
}

fn ordered(actual: Option<&Value>, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    actual
        .and_then(|a| compare_values(a, bound))
        .is_some_and(accept)
}

/// Ordering between two values of the same JSON type; `None` across types.
///
/// Numbers compare as f64. Arrays and objects only compare for equality.
pub(crate) fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            (left == right).then_some(Ordering::Equal)
        }
        _ => None,
    }
}

fn type_rank(v: Option<&Value>) -> u8 {
    match v {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order used for sorting: missing/null < numbers < strings < objects < arrays < bools.
fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    type_rank(a).cmp(&type_rank(b)).then_with(|| match (a, b) {
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    })
}

pub(crate) fn compare_by_keys(a: &Document, b: &Document, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = sort_order(lookup(a, &key.field), lookup(b, &key.field));
        let ord = match key.dir {
            SortDir::Asc => ord,
            SortDir::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    fn matches(expr: Expr, d: Value) -> bool {
        Matcher::compile(&expr).unwrap().matches(&doc(d))
    }

    #[test]
    fn equality_and_null_semantics() {
        assert!(matches(Expr::eq("a", 1), json!({"a": 1.0})));
        assert!(!matches(Expr::eq("a", 1), json!({"a": "1"})));
        assert!(matches(Expr::eq("a", Value::Null), json!({})));
        assert!(matches(Expr::eq("a", Value::Null), json!({"a": null})));
        assert!(!matches(Expr::eq("a", Value::Null), json!({"a": 0})));
    }

    #[test]
    fn not_equal_matches_missing() {
        let ne = Expr::Compare {
            field: "a".into(),
            op: CompareOperator::Ne,
            value: json!(1),
        };
        assert!(matches(ne.clone(), json!({})));
        assert!(matches(ne.clone(), json!({"a": 2})));
        assert!(!matches(ne, json!({"a": 1})));
    }

    #[test]
    fn range_requires_same_type() {
        let gt = Expr::Compare {
            field: "price".into(),
            op: CompareOperator::Gt,
            value: json!(10),
        };
        assert!(matches(gt.clone(), json!({"price": 11})));
        assert!(!matches(gt.clone(), json!({"price": 10})));
        assert!(!matches(gt.clone(), json!({"price": "99"})));
        assert!(!matches(gt, json!({})));
    }

    #[test]
    fn in_and_not_in() {
        let inn = Expr::In {
            field: "s".into(),
            values: vec![json!("a"), json!("b")],
        };
        assert!(matches(inn.clone(), json!({"s": "b"})));
        assert!(!matches(inn, json!({"s": "c"})));

        let nin = Expr::NotIn {
            field: "s".into(),
            values: vec![json!("a")],
        };
        assert!(matches(nin.clone(), json!({"s": "c"})));
        assert!(matches(nin.clone(), json!({})));
        assert!(!matches(nin, json!({"s": "a"})));
    }

    #[test]
    fn arrays_match_on_any_element() {
        let tags = json!({"tags": ["sale", "new"]});
        assert!(matches(Expr::eq("tags", "sale"), tags.clone()));
        assert!(!matches(Expr::eq("tags", "old"), tags.clone()));
        assert!(matches(Expr::eq("tags", json!(["sale", "new"])), tags.clone()));
        assert!(!matches(Expr::eq("tags", json!(["new", "sale"])), tags.clone()));

        let inn = Expr::In {
            field: "tags".into(),
            values: vec![json!("old"), json!("new")],
        };
        assert!(matches(inn, tags.clone()));

        let ne = Expr::Compare {
            field: "tags".into(),
            op: CompareOperator::Ne,
            value: json!("sale"),
        };
        assert!(!matches(ne, tags.clone()));
        let nin = Expr::NotIn {
            field: "tags".into(),
            values: vec![json!("new")],
        };
        assert!(!matches(nin.clone(), tags));
        assert!(matches(nin, json!({"tags": ["sale"]})));
    }

    #[test]
    fn regex_with_options() {
        let re = Expr::Regex {
            field: "name".into(),
            pattern: "^wid".into(),
            options: "i".into(),
        };
        assert!(matches(re.clone(), json!({"name": "Widget"})));
        assert!(!matches(re.clone(), json!({"name": "A widget"})));
        assert!(!matches(re, json!({"name": 5})));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let re = Expr::Regex {
            field: "name".into(),
            pattern: "(".into(),
            options: String::new(),
        };
        assert!(matches!(
            Matcher::compile(&re),
            Err(StoreError::UnsupportedFilter(_))
        ));
    }

    #[test]
    fn exists_and_logic() {
        let exists = Expr::Exists {
            field: "a.b".into(),
            exists: true,
        };
        assert!(matches(exists.clone(), json!({"a": {"b": null}})));
        assert!(!matches(exists, json!({"a": {}})));

        let or = Expr::Or(vec![Expr::eq("a", 1), Expr::eq("b", 2)]);
        assert!(matches(or.clone(), json!({"b": 2})));
        assert!(!matches(Expr::Not(Box::new(or)), json!({"a": 1})));
    }

    #[test]
    fn sorting_is_total_across_types() {
        let a = doc(json!({"v": null}));
        let b = doc(json!({"v": 3}));
        let c = doc(json!({"v": "x"}));
        let keys = [SortKey::asc("v")];
        assert_eq!(compare_by_keys(&a, &b, &keys), Ordering::Less);
        assert_eq!(compare_by_keys(&b, &c, &keys), Ordering::Less);
        assert_eq!(
            compare_by_keys(&b, &c, &[SortKey::desc("v")]),
            Ordering::Greater
        );
    }
}
