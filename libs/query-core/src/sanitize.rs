//! Strips disallowed content from user-supplied filter documents.
//!
//! The sanitizer never fails: offending keys, operators and subtrees are
//! dropped and reported as [`Violation`]s, and the remaining filter is
//! returned.

use std::collections::HashSet;
use std::fmt;

use regex::RegexBuilder;
use serde_json::{Map, Value};
use tracing::warn;

use crate::dialect::{self, FilterDocument};
use crate::path;

pub const DEFAULT_MAX_FILTER_DEPTH: usize = 5;

#[derive(Clone, Debug)]
pub struct SanitizeOptions {
    /// When set, only these fields (or their sub-paths) may be filtered on.
    pub allowed_fields: Option<HashSet<String>>,
    /// Fields a user may never filter on. A key with this name is stripped
    /// wherever it appears, including inside sub-documents and combinators.
    pub protected_fields: HashSet<String>,
    pub max_depth: usize,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            allowed_fields: None,
            protected_fields: HashSet::new(),
            max_depth: DEFAULT_MAX_FILTER_DEPTH,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    ProtectedField { path: String },
    DisallowedField { path: String },
    InvalidFieldName { path: String },
    DangerousOperator { path: String, operator: String },
    UnknownOperator { path: String, operator: String },
    MalformedCombinator { path: String, operator: String },
    InvalidPattern { path: String, pattern: String },
    DepthExceeded { path: String, max_depth: usize },
}

impl Violation {
    pub fn path(&self) -> &str {
        match self {
            Violation::ProtectedField { path }
            | Violation::DisallowedField { path }
            | Violation::InvalidFieldName { path }
            | Violation::DangerousOperator { path, .. }
            | Violation::UnknownOperator { path, .. }
            | Violation::MalformedCombinator { path, .. }
            | Violation::InvalidPattern { path, .. }
            | Violation::DepthExceeded { path, .. } => path,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::ProtectedField { path } => write!(f, "protected field '{path}'"),
            Violation::DisallowedField { path } => write!(f, "field '{path}' is not filterable"),
            Violation::InvalidFieldName { path } => write!(f, "invalid field name '{path}'"),
            Violation::DangerousOperator { path, operator } => {
                write!(f, "operator {operator} is not allowed (at '{path}')")
            }
            Violation::UnknownOperator { path, operator } => {
                write!(f, "unknown operator {operator} (at '{path}')")
            }
            Violation::MalformedCombinator { path, operator } => {
                write!(f, "{operator} expects an array of objects (at '{path}')")
            }
            Violation::InvalidPattern { path, pattern } => {
                write!(f, "regex '{pattern}' does not compile (at '{path}')")
            }
            Violation::DepthExceeded { path, max_depth } => {
                write!(f, "nesting deeper than {max_depth} at '{path}'")
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sanitized {
    pub filter: FilterDocument,
    pub violations: Vec<Violation>,
}

#[derive(Clone, Debug, Default)]
pub struct FilterSanitizer {
    options: SanitizeOptions,
}

impl FilterSanitizer {
    pub fn new(options: SanitizeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SanitizeOptions {
        &self.options
    }

    /// Sanitize a filter starting at depth 0.
    pub fn sanitize(&self, filter: &FilterDocument) -> Sanitized {
        self.sanitize_at(filter, 0)
    }

    pub fn sanitize_at(&self, filter: &FilterDocument, depth: usize) -> Sanitized {
        let mut violations = Vec::new();
        let filter = self.sanitize_document(filter, depth, "", &mut violations);
        if !violations.is_empty() {
            let listed = violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            warn!(
                count = violations.len(),
                violations = %listed,
                "removed disallowed content from filter"
            );
        }
        Sanitized { filter, violations }
    }

    fn sanitize_document(
        &self,
        doc: &FilterDocument,
        depth: usize,
        prefix: &str,
        violations: &mut Vec<Violation>,
    ) -> FilterDocument {
        if depth > self.options.max_depth {
            violations.push(Violation::DepthExceeded {
                path: display_path(prefix),
                max_depth: self.options.max_depth,
            });
            return Map::new();
        }

        let mut out = Map::with_capacity(doc.len());
        for (key, value) in doc {
            if key.starts_with('$') {
                let at = display_path(prefix);
                if dialect::is_logical_operator(key) {
                    if let Some(kept) = self.sanitize_branches(key, value, depth, prefix, violations)
                    {
                        out.insert(key.clone(), kept);
                    }
                } else if dialect::is_dangerous_operator(key) {
                    violations.push(Violation::DangerousOperator {
                        path: at,
                        operator: key.clone(),
                    });
                } else {
                    violations.push(Violation::UnknownOperator {
                        path: at,
                        operator: key.clone(),
                    });
                }
                continue;
            }

            let full = path::join(prefix, key);
            if self.is_protected(key, &full) {
                violations.push(Violation::ProtectedField { path: full });
                continue;
            }
            if !path::is_valid_field_path(&full) {
                violations.push(Violation::InvalidFieldName { path: full });
                continue;
            }
            if !self.is_allowed(&full) {
                violations.push(Violation::DisallowedField { path: full });
                continue;
            }

            match value {
                Value::Object(m) if dialect::is_operator_object(m) => {
                    let ops = self.sanitize_operators(m, depth + 1, &full, violations);
                    if !ops.is_empty() {
                        out.insert(key.clone(), Value::Object(ops));
                    }
                }
                Value::Object(m) if !m.is_empty() => {
                    let sub = self.sanitize_document(m, depth + 1, &full, violations);
                    if !sub.is_empty() {
                        out.insert(key.clone(), Value::Object(sub));
                    }
                }
                other => {
                    out.insert(key.clone(), other.clone());
                }
            }
        }
        out
    }

    fn sanitize_branches(
        &self,
        op: &str,
        value: &Value,
        depth: usize,
        prefix: &str,
        violations: &mut Vec<Violation>,
    ) -> Option<Value> {
        let Some(items) = value.as_array() else {
            violations.push(Violation::MalformedCombinator {
                path: display_path(prefix),
                operator: op.to_string(),
            });
            return None;
        };

        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Object(m) => {
                    let sub = self.sanitize_document(m, depth + 1, prefix, violations);
                    if !sub.is_empty() {
                        kept.push(Value::Object(sub));
                    }
                }
                _ => violations.push(Violation::MalformedCombinator {
                    path: display_path(prefix),
                    operator: op.to_string(),
                }),
            }
        }
        (!kept.is_empty()).then_some(Value::Array(kept))
    }

    fn sanitize_operators(
        &self,
        ops: &FilterDocument,
        depth: usize,
        field: &str,
        violations: &mut Vec<Violation>,
    ) -> FilterDocument {
        if depth > self.options.max_depth {
            violations.push(Violation::DepthExceeded {
                path: field.to_string(),
                max_depth: self.options.max_depth,
            });
            return Map::new();
        }

        let bad_pattern = invalid_pattern(ops);
        let mut out = Map::with_capacity(ops.len());
        for (op, operand) in ops {
            if let Some(pattern) = &bad_pattern {
                // $options is meaningless without its pattern
                match op.as_str() {
                    "$regex" | "regex" => {
                        violations.push(Violation::InvalidPattern {
                            path: field.to_string(),
                            pattern: pattern.clone(),
                        });
                        continue;
                    }
                    "$options" | "options" => continue,
                    _ => {}
                }
            }
            if dialect::is_dangerous_operator(op) {
                violations.push(Violation::DangerousOperator {
                    path: field.to_string(),
                    operator: op.clone(),
                });
                continue;
            }
            if !dialect::is_field_operator(op) {
                violations.push(Violation::UnknownOperator {
                    path: field.to_string(),
                    operator: op.clone(),
                });
                continue;
            }
            match (op.as_str(), operand) {
                ("$not" | "not", Value::Object(inner)) => {
                    let inner = self.sanitize_operators(inner, depth + 1, field, violations);
                    if !inner.is_empty() {
                        out.insert(op.clone(), Value::Object(inner));
                    }
                }
                _ => {
                    out.insert(op.clone(), operand.clone());
                }
            }
        }
        out
    }

    /// A key is protected by name at any depth, and a dotted path is
    /// protected when it starts at a protected field.
    fn is_protected(&self, key: &str, full: &str) -> bool {
        self.options.protected_fields.iter().any(|p| {
            key == p
                || full == p
                || full
                    .strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    fn is_allowed(&self, full: &str) -> bool {
        match &self.options.allowed_fields {
            None => true,
            Some(allowed) => path::prefixes(full).any(|p| allowed.contains(p)),
        }
    }
}

/// The pattern of a string `$regex` operand that fails to compile with the
/// operator's `$options`. Non-string operands are left to `to_expr`.
fn invalid_pattern(ops: &FilterDocument) -> Option<String> {
    let pattern = ops.get("$regex").or_else(|| ops.get("regex"))?.as_str()?;
    let options = ops
        .get("$options")
        .or_else(|| ops.get("options"))
        .and_then(Value::as_str)
        .unwrap_or("");

    let mut builder = RegexBuilder::new(pattern);
    for flag in options.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            _ => return Some(pattern.to_string()),
        };
    }
    builder.build().is_err().then(|| pattern.to_string())
}

fn display_path(prefix: &str) -> String {
    if prefix.is_empty() {
        "<root>".to_string()
    } else {
        prefix.to_string()
    }
}
