//! In-process document store. Used by `--mock` runs and by tests.

mod matcher;

use async_trait::async_trait;
use dashmap::DashMap;
use query_core::Expr;
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::store::{document_id, project, Document, DocumentStore, FindQuery, ID_FIELD};
use matcher::{compare_by_keys, Matcher};

/// Collections keyed by name; documents kept in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> StoreResult<Vec<Document>> {
        let matcher = Matcher::compile(&query.filter)?;
        let Some(docs) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<&Document> = docs.iter().filter(|d| matcher.matches(d)).collect();
        if !query.sort.is_empty() {
            hits.sort_by(|a, b| compare_by_keys(a, b, &query.sort));
        }

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);

        let out: Vec<Document> = hits
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|d| match &query.projection {
                Some(fields) => project(d, fields),
                None => d.clone(),
            })
            .collect();
        trace!(collection, returned = out.len(), "memory find");
        Ok(out)
    }

    async fn count(&self, collection: &str, filter: &Expr) -> StoreResult<u64> {
        let matcher = Matcher::compile(filter)?;
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matcher.matches(d)).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, collection: &str, doc: Document) -> StoreResult<()> {
        let id = document_id(&doc)?.to_string();
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| d.get(ID_FIELD) == doc.get(ID_FIELD)) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                id,
            });
        }
        docs.push(doc);
        Ok(())
    }

    async fn replace(&self, collection: &str, id: &str, mut doc: Document) -> StoreResult<bool> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some(slot) = docs
            .iter_mut()
            .find(|d| document_id(d).is_ok_and(|existing| existing == id))
        else {
            return Ok(false);
        };
        doc.insert(ID_FIELD.to_string(), id.into());
        *slot = doc;
        Ok(true)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| !document_id(d).is_ok_and(|existing| existing == id));
        Ok(docs.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_core::SortKey;
    use serde_json::{json, Value};

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, price) in [("a", 3), ("b", 1), ("c", 2)] {
            store
                .insert("items", doc(json!({"id": id, "price": price})))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn find_sorts_skips_and_limits() {
        let store = seeded().await;
        let q = FindQuery {
            sort: vec![SortKey::asc("price")],
            skip: 1,
            limit: Some(1),
            ..Default::default()
        };
        let out = store.find("items", &q).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], json!("c"));
    }

    #[tokio::test]
    async fn unknown_collection_is_empty() {
        let store = MemoryStore::new();
        assert!(store
            .find("nope", &FindQuery::default())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(store.count("nope", &Expr::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = seeded().await;
        let err = store
            .insert("items", doc(json!({"id": "a"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn replace_and_delete() {
        let store = seeded().await;
        assert!(store
            .replace("items", "a", doc(json!({"price": 9})))
            .await
            .unwrap());
        let a = store
            .find_one("items", &Expr::eq("id", "a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a["price"], json!(9));
        assert_eq!(a["id"], json!("a"));

        assert!(!store.replace("items", "zz", Document::new()).await.unwrap());
        assert!(store.delete("items", "a").await.unwrap());
        assert!(!store.delete("items", "a").await.unwrap());
        assert_eq!(store.count("items", &Expr::All).await.unwrap(), 2);
    }
}
