use thiserror::Error;

use crate::domain::error::DomainError;

/// Errors that are safe to expose outside the module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error")]
    Internal,
}

impl From<DomainError> for CatalogError {
    fn from(domain_error: DomainError) -> Self {
        match domain_error {
            DomainError::NotFound { entity, id } => Self::NotFound {
                entity: entity.to_string(),
                id,
            },
            e @ DomainError::AlreadyExists { .. } => Self::Conflict(e.to_string()),
            DomainError::Validation { field, message } => Self::Validation {
                message: format!("{field}: {message}"),
            },
            DomainError::Storage { .. } => Self::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_details_are_hidden() {
        let e: CatalogError = DomainError::storage("disk on fire").into();
        assert_eq!(e, CatalogError::Internal);
        assert_eq!(e.to_string(), "Internal error");
    }

    #[test]
    fn conflict_keeps_message() {
        let e: CatalogError = DomainError::already_exists("Tag", "slug", "red").into();
        assert_eq!(e.to_string(), "Tag with slug 'red' already exists");
    }
}
