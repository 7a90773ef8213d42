use thiserror::Error;

/// Errors raised while translating or compiling a filter document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("invalid operand for {op} on '{field}': {reason}")]
    InvalidOperand {
        field: String,
        op: String,
        reason: &'static str,
    },

    #[error("object for '{0}' mixes operators and field names")]
    MixedOperatorKeys(String),

    #[error("{0} requires a non-empty array of objects")]
    EmptyCombinator(String),

    #[error("invalid field path: '{0}'")]
    InvalidFieldPath(String),

    #[error("conflicting pattern operators on '{0}'")]
    ConflictingPatterns(String),
}

impl Error {
    pub(crate) fn operand(field: &str, op: &str, reason: &'static str) -> Self {
        Self::InvalidOperand {
            field: field.to_string(),
            op: op.to_string(),
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
