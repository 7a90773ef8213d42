use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogEventKind {
    Created,
    Updated,
    Deleted,
    Restored,
    Purged,
}

/// Transport-agnostic domain event.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEvent {
    pub kind: CatalogEventKind,
    pub collection: &'static str,
    pub id: String,
    pub at: DateTime<Utc>,
}

impl CatalogEvent {
    pub fn now(kind: CatalogEventKind, collection: &'static str, id: impl Into<String>) -> Self {
        Self {
            kind,
            collection,
            id: id.into(),
            at: Utc::now(),
        }
    }
}
