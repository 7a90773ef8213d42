//! Filter AST shared by every storage backend.
//!
//! Produced by [`crate::dialect::to_expr`] from a native-dialect filter
//! document; consumed by the store compilers (in-memory matcher, SQL condition).

use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Expr {
    /// Matches every document (the empty filter).
    #[default]
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
    NotIn {
        field: String,
        values: Vec<Value>,
    },
    Regex {
        field: String,
        pattern: String,
        options: String,
    },
    Exists {
        field: String,
        exists: bool,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOperator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Expr {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::Compare {
            field: field.into(),
            op: CompareOperator::Eq,
            value: value.into(),
        }
    }

    /// Conjunction that drops `All` terms and unwraps single-element lists.
    pub fn all_of(parts: Vec<Expr>) -> Self {
        let mut parts: Vec<Expr> = parts.into_iter().filter(|e| !e.is_all()).collect();
        match parts.len() {
            0 => Expr::All,
            1 => parts.remove(0),
            _ => Expr::And(parts),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Expr::All)
    }
}

/// Sort direction for one key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn from_desc(desc: bool) -> Self {
        if desc {
            SortDir::Desc
        } else {
            SortDir::Asc
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub dir: SortDir,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDir::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDir::Desc,
        }
    }
}
