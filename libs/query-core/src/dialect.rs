//! JSON filter dialect.
//!
//! A filter document maps field paths to literals (equality) or to operator
//! objects. Two spellings of operators are accepted on input: the native
//! `$`-prefixed set (`$eq`, `$in`, `$regex`, ...) and a generic set
//! (`eq`, `in`, `contains`, `startsWith`, ...). [`translate`] rewrites the
//! generic spelling into the native one; [`to_expr`] compiles a native
//! document into the backend-neutral [`Expr`].

use serde_json::{Map, Value};

use crate::ast::{CompareOperator, Expr};
use crate::error::{Error, Result};
use crate::path;

/// A filter expressed as a JSON object.
pub type FilterDocument = Map<String, Value>;

pub const LOGICAL_OPERATORS: &[&str] = &["$and", "$or", "$nor"];

/// Operators that execute code or reach outside the queried document.
pub const DANGEROUS_OPERATORS: &[&str] = &[
    "$where",
    "$expr",
    "$function",
    "$accumulator",
    "$jsonSchema",
    "$text",
    "$lookup",
];

const FIELD_OPERATORS: &[&str] = &[
    "$eq", "$ne", "$gt", "$gte", "$lt", "$lte", "$in", "$nin", "$regex", "$options", "$exists",
    "$not",
];

const GENERIC_ALIASES: &[(&str, &str)] = &[
    ("eq", "$eq"),
    ("ne", "$ne"),
    ("gt", "$gt"),
    ("gte", "$gte"),
    ("lt", "$lt"),
    ("lte", "$lte"),
    ("in", "$in"),
    ("nin", "$nin"),
    ("notIn", "$nin"),
    ("regex", "$regex"),
    ("options", "$options"),
    ("exists", "$exists"),
    ("not", "$not"),
];

const PATTERN_ALIASES: &[&str] = &["contains", "startsWith", "endsWith"];

const REGEX_OPTIONS: &str = "imsx";

pub fn is_logical_operator(key: &str) -> bool {
    LOGICAL_OPERATORS.contains(&key)
}

pub fn is_dangerous_operator(key: &str) -> bool {
    DANGEROUS_OPERATORS.contains(&key)
}

/// Known field-level operator in either spelling.
pub fn is_field_operator(key: &str) -> bool {
    FIELD_OPERATORS.contains(&key) || generic_alias(key).is_some() || PATTERN_ALIASES.contains(&key)
}

/// Anything that reads as an operator: `$`-prefixed or a generic operator name.
pub fn is_operator_key(key: &str) -> bool {
    key.starts_with('$') || is_field_operator(key)
}

/// An object whose keys are all operators. Objects without operator keys
/// are nested sub-documents.
pub fn is_operator_object(map: &FilterDocument) -> bool {
    !map.is_empty() && map.keys().all(|k| is_operator_key(k))
}

fn generic_alias(key: &str) -> Option<&'static str> {
    GENERIC_ALIASES
        .iter()
        .find(|(generic, _)| *generic == key)
        .map(|(_, native)| *native)
}

/* ---------- generic -> native translation ---------- */

/// Rewrite generic operator names into the native dialect.
///
/// `contains`/`startsWith`/`endsWith` become a case-insensitive `$regex`
/// over the escaped operand.
pub fn translate(doc: &FilterDocument) -> Result<FilterDocument> {
    translate_document(doc, "")
}

fn translate_document(doc: &FilterDocument, prefix: &str) -> Result<FilterDocument> {
    let mut out = Map::with_capacity(doc.len());
    for (key, value) in doc {
        if is_logical_operator(key) {
            let items = value
                .as_array()
                .ok_or_else(|| Error::EmptyCombinator(key.clone()))?;
            let translated = items
                .iter()
                .map(|item| match item {
                    Value::Object(m) => translate_document(m, prefix).map(Value::Object),
                    _ => Err(Error::EmptyCombinator(key.clone())),
                })
                .collect::<Result<Vec<_>>>()?;
            out.insert(key.clone(), Value::Array(translated));
            continue;
        }

        let field = path::join(prefix, key);
        let translated = match value {
            Value::Object(m) if is_operator_object(m) => {
                Value::Object(translate_operators(&field, m)?)
            }
            Value::Object(m) => Value::Object(translate_document(m, &field)?),
            other => other.clone(),
        };
        out.insert(key.clone(), translated);
    }
    Ok(out)
}

fn translate_operators(field: &str, ops: &FilterDocument) -> Result<FilterDocument> {
    let mut out = Map::with_capacity(ops.len());
    for (op, operand) in ops {
        if PATTERN_ALIASES.contains(&op.as_str()) {
            let text = operand
                .as_str()
                .ok_or_else(|| Error::operand(field, op, "expected a string"))?;
            let escaped = regex::escape(text);
            let pattern = match op.as_str() {
                "startsWith" => format!("^{escaped}"),
                "endsWith" => format!("{escaped}$"),
                _ => escaped,
            };
            if out.contains_key("$regex") {
                return Err(Error::ConflictingPatterns(field.to_string()));
            }
            out.insert("$regex".to_string(), Value::String(pattern));
            out.insert("$options".to_string(), Value::String("i".to_string()));
            continue;
        }

        let native = if op.starts_with('$') {
            op.as_str()
        } else {
            generic_alias(op).unwrap_or(op.as_str())
        };
        if native == "$regex" && out.contains_key("$regex") {
            return Err(Error::ConflictingPatterns(field.to_string()));
        }
        let operand = match (native, operand) {
            ("$not", Value::Object(inner)) => Value::Object(translate_operators(field, inner)?),
            _ => operand.clone(),
        };
        out.insert(native.to_string(), operand);
    }
    Ok(out)
}

/* ---------- native document -> AST ---------- */

/// Compile a native-dialect filter document into an [`Expr`].
pub fn to_expr(doc: &FilterDocument) -> Result<Expr> {
    compile_document(doc, "")
}

fn compile_document(doc: &FilterDocument, prefix: &str) -> Result<Expr> {
    let mut parts = Vec::with_capacity(doc.len());
    for (key, value) in doc {
        if key.starts_with('$') {
            let expr = match key.as_str() {
                "$and" => Expr::And(compile_branches(key, value, prefix)?),
                "$or" => Expr::Or(compile_branches(key, value, prefix)?),
                "$nor" => Expr::Not(Box::new(Expr::Or(compile_branches(key, value, prefix)?))),
                _ => return Err(Error::UnknownOperator(key.clone())),
            };
            parts.push(expr);
            continue;
        }

        let field = path::join(prefix, key);
        if !path::is_valid_field_path(&field) {
            return Err(Error::InvalidFieldPath(field));
        }
        parts.push(compile_field(&field, value)?);
    }
    Ok(Expr::all_of(parts))
}

fn compile_branches(op: &str, value: &Value, prefix: &str) -> Result<Vec<Expr>> {
    let items = match value {
        Value::Array(items) if !items.is_empty() => items,
        _ => return Err(Error::EmptyCombinator(op.to_string())),
    };
    items
        .iter()
        .map(|item| match item {
            Value::Object(m) => compile_document(m, prefix),
            _ => Err(Error::EmptyCombinator(op.to_string())),
        })
        .collect()
}

fn compile_field(field: &str, value: &Value) -> Result<Expr> {
    match value {
        Value::Object(m) if m.is_empty() => Ok(Expr::All),
        Value::Object(m) if m.keys().all(|k| k.starts_with('$')) => compile_operators(field, m),
        Value::Object(m) if m.keys().any(|k| k.starts_with('$')) => {
            Err(Error::MixedOperatorKeys(field.to_string()))
        }
        Value::Object(m) => compile_document(m, field),
        literal => Ok(Expr::Compare {
            field: field.to_string(),
            op: CompareOperator::Eq,
            value: literal.clone(),
        }),
    }
}

fn compile_operators(field: &str, ops: &FilterDocument) -> Result<Expr> {
    let options = match ops.get("$options") {
        None => String::new(),
        Some(Value::String(s)) if s.chars().all(|c| REGEX_OPTIONS.contains(c)) => s.clone(),
        Some(_) => return Err(Error::operand(field, "$options", "expected a subset of \"imsx\"")),
    };
    if !options.is_empty() && !ops.contains_key("$regex") {
        return Err(Error::operand(field, "$options", "requires $regex"));
    }

    let mut parts = Vec::with_capacity(ops.len());
    for (op, operand) in ops {
        let expr = match op.as_str() {
            "$eq" => compare(field, CompareOperator::Eq, operand),
            "$ne" => compare(field, CompareOperator::Ne, operand),
            "$gt" => ordered(field, op, CompareOperator::Gt, operand)?,
            "$gte" => ordered(field, op, CompareOperator::Ge, operand)?,
            "$lt" => ordered(field, op, CompareOperator::Lt, operand)?,
            "$lte" => ordered(field, op, CompareOperator::Le, operand)?,
            "$in" => Expr::In {
                field: field.to_string(),
                values: list_operand(field, op, operand)?,
            },
            "$nin" => Expr::NotIn {
                field: field.to_string(),
                values: list_operand(field, op, operand)?,
            },
            "$regex" => Expr::Regex {
                field: field.to_string(),
                pattern: operand
                    .as_str()
                    .ok_or_else(|| Error::operand(field, op, "expected a string"))?
                    .to_string(),
                options: options.clone(),
            },
            "$options" => continue,
            "$exists" => Expr::Exists {
                field: field.to_string(),
                exists: operand
                    .as_bool()
                    .ok_or_else(|| Error::operand(field, op, "expected a boolean"))?,
            },
            "$not" => match operand {
                Value::Object(inner) if !inner.is_empty() => {
                    Expr::Not(Box::new(compile_operators(field, inner)?))
                }
                Value::String(pattern) => Expr::Not(Box::new(Expr::Regex {
                    field: field.to_string(),
                    pattern: pattern.clone(),
                    options: String::new(),
                })),
                _ => return Err(Error::operand(field, op, "expected an operator object")),
            },
            other => return Err(Error::UnknownOperator(other.to_string())),
        };
        parts.push(expr);
    }
    Ok(Expr::all_of(parts))
}

fn compare(field: &str, op: CompareOperator, operand: &Value) -> Expr {
    Expr::Compare {
        field: field.to_string(),
        op,
        value: operand.clone(),
    }
}

fn ordered(field: &str, name: &str, op: CompareOperator, operand: &Value) -> Result<Expr> {
    match operand {
        Value::Number(_) | Value::String(_) | Value::Bool(_) => Ok(compare(field, op, operand)),
        _ => Err(Error::operand(field, name, "expected a number, string or boolean")),
    }
}

fn list_operand(field: &str, op: &str, operand: &Value) -> Result<Vec<Value>> {
    operand
        .as_array()
        .cloned()
        .ok_or_else(|| Error::operand(field, op, "expected an array"))
}
