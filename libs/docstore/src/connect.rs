use std::sync::Arc;

use tracing::info;
use url::Url;

use crate::error::{StoreError, StoreResult};
use crate::memory::MemoryStore;
use crate::sql::SqlDocumentStore;
use crate::store::DocumentStore;

/// Open a store from a URL.
///
/// `memory://` gives a fresh [`MemoryStore`]; `sqlite:` URLs (including
/// `sqlite::memory:`) give a [`SqlDocumentStore`] with migrations applied.
pub async fn connect(url: &str) -> StoreResult<Arc<dyn DocumentStore>> {
    let parsed = Url::parse(url).map_err(|_| StoreError::UnsupportedUrl(url.to_string()))?;

    let store: Arc<dyn DocumentStore> = match parsed.scheme() {
        "memory" => Arc::new(MemoryStore::new()),
        "sqlite" => Arc::new(SqlDocumentStore::connect(url).await?),
        _ => return Err(StoreError::UnsupportedUrl(url.to_string())),
    };
    info!(backend = store.backend(), "document store connected");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_url_gives_memory_store() {
        let store = connect("memory://").await.unwrap();
        assert_eq!(store.backend(), "memory");
    }

    #[tokio::test]
    async fn sqlite_memory_url_gives_sql_store() {
        let store = connect("sqlite::memory:").await.unwrap();
        assert_eq!(store.backend(), "sqlite");
    }

    #[tokio::test]
    async fn other_schemes_are_rejected() {
        assert!(matches!(
            connect("postgres://localhost/db").await,
            Err(StoreError::UnsupportedUrl(_))
        ));
        assert!(matches!(
            connect("nonsense").await,
            Err(StoreError::UnsupportedUrl(_))
        ));
    }
}
