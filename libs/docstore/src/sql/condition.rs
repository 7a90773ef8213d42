//! Compiles the filter AST into a SeaORM [`Condition`] over the JSON `body` column.
//!
//! Every leaf is guarded by the stored JSON type, so a comparison never
//! yields SQL NULL and `NOT` behaves like the in-memory matcher.

use query_core::{CompareOperator, Expr, SortDir};
use sea_orm::sea_query::{Expr as SqlExpr, Func, LikeExpr, SimpleExpr};
use sea_orm::{Condition, Order, Value as SqlValue};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

const NUMBER_TYPES: &str = "('integer', 'real')";
const TEXT_TYPES: &str = "('text')";
const BOOL_TYPES: &str = "('true', 'false')";
const ARRAY_TYPES: &str = "('array')";
const OBJECT_TYPES: &str = "('object')";

/// SQLite JSON path for a dotted field, with every label quoted.
pub(crate) fn json_path(field: &str) -> String {
    let mut path = String::from("$");
    for seg in field.split('.') {
        path.push_str(".\"");
        path.push_str(seg);
        path.push('"');
    }
    path
}

pub(crate) fn field_expr(field: &str) -> SimpleExpr {
    SqlExpr::cust_with_values("json_extract(\"body\", ?)", [json_path(field)])
}

/// JSON type name of the field, `'missing'` when absent.
fn type_is(field: &str, types: &str) -> SimpleExpr {
    SqlExpr::cust_with_values(
        format!("COALESCE(json_type(\"body\", ?), 'missing') IN {types}"),
        [json_path(field)],
    )
}

fn is_null_or_missing(field: &str) -> SimpleExpr {
    SqlExpr::cust_with_values(
        "COALESCE(json_type(\"body\", ?), 'null') = 'null'",
        [json_path(field)],
    )
}

fn always(value: bool) -> Condition {
    Condition::all().add(SqlExpr::cust(if value { "1=1" } else { "1=0" }))
}

/// Bind value plus the JSON types it may be compared against.
fn scalar(value: &Value) -> StoreResult<(SqlValue, &'static str)> {
    match value {
        Value::Bool(b) => Ok((SqlValue::from(i64::from(*b)), BOOL_TYPES)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok((SqlValue::from(i), NUMBER_TYPES)),
            None => n
                .as_f64()
                .map(|f| (SqlValue::from(f), NUMBER_TYPES))
                .ok_or_else(|| StoreError::unsupported(format!("number {n}"))),
        },
        Value::String(s) => Ok((SqlValue::from(s.clone()), TEXT_TYPES)),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(StoreError::unsupported(
            "null, arrays and objects cannot be ordered in SQL",
        )),
    }
}

/// The field is an array with an element satisfying `test` (over `e.type`
/// and `e.value`).
fn element_matches(field: &str, test: &str, binds: Vec<SqlValue>) -> SimpleExpr {
    let path = json_path(field);
    let mut values = vec![SqlValue::from(path.clone()), SqlValue::from(path)];
    values.extend(binds);
    SqlExpr::cust_with_values(
        format!(
            "(COALESCE(json_type(\"body\", ?), 'missing') = 'array' \
             AND EXISTS (SELECT 1 FROM json_each(\"body\", ?) AS e WHERE {test}))"
        ),
        values,
    )
}

/// Equal to the value itself, or an array holding an equal element.
fn equals(field: &str, value: &Value) -> StoreResult<Condition> {
    let (whole, element) = match value {
        Value::Null => (
            Condition::all().add(is_null_or_missing(field)),
            element_matches(field, "e.type = 'null'", Vec::new()),
        ),
        Value::Array(_) | Value::Object(_) => {
            let types = if value.is_array() { ARRAY_TYPES } else { OBJECT_TYPES };
            let json = value.to_string();
            let whole = Condition::all().add(type_is(field, types)).add(SqlExpr::cust_with_values(
                "json_extract(\"body\", ?) = json(?)",
                [json_path(field), json.clone()],
            ));
            let test = format!("e.type IN {types} AND e.value = json(?)");
            (whole, element_matches(field, &test, vec![SqlValue::from(json)]))
        }
        _ => {
            let (bind, types) = scalar(value)?;
            let whole = Condition::all()
                .add(type_is(field, types))
                .add(SqlExpr::expr(field_expr(field)).eq(bind.clone()));
            let test = format!("e.type IN {types} AND e.value = ?");
            (whole, element_matches(field, &test, vec![bind]))
        }
    };
    Ok(Condition::any().add(whole).add(element))
}

fn compare(field: &str, op: CompareOperator, value: &Value) -> StoreResult<Condition> {
    match op {
        CompareOperator::Eq => equals(field, value),
        CompareOperator::Ne => Ok(Condition::all().not().add(equals(field, value)?)),
        CompareOperator::Gt | CompareOperator::Ge | CompareOperator::Lt | CompareOperator::Le => {
            let (bind, types) = scalar(value)?;
            let col = SqlExpr::expr(field_expr(field));
            let cmp = match op {
                CompareOperator::Gt => col.gt(bind),
                CompareOperator::Ge => col.gte(bind),
                CompareOperator::Lt => col.lt(bind),
                _ => col.lte(bind),
            };
            Ok(Condition::all().add(type_is(field, types)).add(cmp))
        }
    }
}

fn membership(field: &str, values: &[Value]) -> StoreResult<Condition> {
    if values.is_empty() {
        return Ok(always(false));
    }
    values
        .iter()
        .try_fold(Condition::any(), |acc, v| {
            Ok::<_, StoreError>(acc.add(equals(field, v)?))
        })
}

/// A regex that is a plain literal with optional `^`/`$` anchors.
#[derive(Debug, PartialEq)]
struct LiteralPattern {
    text: String,
    starts: bool,
    ends: bool,
}

fn literal_pattern(pattern: &str) -> Option<LiteralPattern> {
    let (starts, rest) = match pattern.strip_prefix('^') {
        Some(r) => (true, r),
        None => (false, pattern),
    };
    let (ends, body) = match rest.strip_suffix('$') {
        Some(b) if !b.ends_with('\\') => (true, b),
        _ => (false, rest),
    };

    let mut text = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars.next()?;
                if escaped.is_ascii_alphanumeric() {
                    return None;
                }
                text.push(escaped);
            }
            '.' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$' => {
                return None
            }
            other => text.push(other),
        }
    }
    Some(LiteralPattern { text, starts, ends })
}

fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out
}

fn regex(field: &str, pattern: &str, options: &str) -> StoreResult<Condition> {
    if options.chars().any(|c| c != 'i') {
        return Err(StoreError::unsupported(format!(
            "regex options '{options}'"
        )));
    }
    let lit = literal_pattern(pattern).ok_or_else(|| {
        StoreError::unsupported(format!("regex '{pattern}' is not a plain literal"))
    })?;
    let guard = type_is(field, TEXT_TYPES);

    // LOWER and LIKE fold ASCII letters only
    let matcher = if options.contains('i') {
        let like = format!(
            "{}{}{}",
            if lit.starts { "" } else { "%" },
            like_escape(&lit.text.to_ascii_lowercase()),
            if lit.ends { "" } else { "%" },
        );
        SqlExpr::expr(Func::lower(field_expr(field))).like(LikeExpr::new(like).escape('\\'))
    } else {
        let path = json_path(field);
        let len = lit.text.chars().count() as i64;
        match (lit.starts, lit.ends) {
            (true, true) => SqlExpr::expr(field_expr(field)).eq(lit.text),
            (true, false) => SqlExpr::cust_with_values(
                "substr(json_extract(\"body\", ?), 1, ?) = ?",
                [SqlValue::from(path), SqlValue::from(len), SqlValue::from(lit.text)],
            ),
            (false, true) => SqlExpr::cust_with_values(
                "substr(json_extract(\"body\", ?), -?) = ?",
                [SqlValue::from(path), SqlValue::from(len), SqlValue::from(lit.text)],
            ),
            (false, false) => SqlExpr::cust_with_values(
                "instr(json_extract(\"body\", ?), ?) > 0",
                [SqlValue::from(path), SqlValue::from(lit.text)],
            ),
        }
    };
    Ok(Condition::all().add(guard).add(matcher))
}

pub(crate) fn expr_to_condition(expr: &Expr) -> StoreResult<Condition> {
    Ok(match expr {
        Expr::All => always(true),
        Expr::Compare { field, op, value } => compare(field, *op, value)?,
        Expr::In { field, values } => membership(field, values)?,
        Expr::NotIn { field, values } => Condition::all().not().add(membership(field, values)?),
        Expr::Regex {
            field,
            pattern,
            options,
        } => regex(field, pattern, options)?,
        Expr::Exists { field, exists } => {
            let t = SqlExpr::cust_with_values("json_type(\"body\", ?)", [json_path(field)]);
            let t = SqlExpr::expr(t);
            Condition::all().add(if *exists { t.is_not_null() } else { t.is_null() })
        }
        Expr::And(items) if items.is_empty() => always(true),
        Expr::Or(items) if items.is_empty() => always(false),
        Expr::And(items) => items
            .iter()
            .try_fold(Condition::all(), |acc, e| Ok::<_, StoreError>(acc.add(expr_to_condition(e)?)))?,
        Expr::Or(items) => items
            .iter()
            .try_fold(Condition::any(), |acc, e| Ok::<_, StoreError>(acc.add(expr_to_condition(e)?)))?,
        Expr::Not(inner) => Condition::all().not().add(expr_to_condition(inner)?),
    })
}

pub(crate) fn order(dir: SortDir) -> Order {
    match dir {
        SortDir::Asc => Order::Asc,
        SortDir::Desc => Order::Desc,
    }
}
