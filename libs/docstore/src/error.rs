use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[error("invalid filter: {0}")]
    Filter(#[from] query_core::Error),

    #[error("filter not supported by this store: {0}")]
    UnsupportedFilter(String),

    #[error("document '{id}' already exists in '{collection}'")]
    Duplicate { collection: String, id: String },

    #[error("document has no string 'id' field")]
    MissingId,

    #[error("stored document is corrupt: {0}")]
    Corrupt(String),

    #[error("unsupported store url: {0}")]
    UnsupportedUrl(String),
}

impl StoreError {
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedFilter(reason.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
