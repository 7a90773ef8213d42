//! Storage port: a collection-oriented JSON document store.

use async_trait::async_trait;
use query_core::{Expr, SortKey};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// A stored record: a JSON object carrying a string `id`.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "id";

/// Read query against one collection.
#[derive(Clone, Debug, Default)]
pub struct FindQuery {
    pub filter: Expr,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: Option<u64>,
    /// Fields to keep; `id` is always kept.
    pub projection: Option<Vec<String>>,
}

impl FindQuery {
    pub fn filter(filter: Expr) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }
}

/// Port implemented by every storage backend.
///
/// Object-safe via `async_trait` so services hold `Arc<dyn DocumentStore>`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs ("memory", "sqlite").
    fn backend(&self) -> &'static str;

    async fn find(&self, collection: &str, query: &FindQuery) -> StoreResult<Vec<Document>>;

    async fn count(&self, collection: &str, filter: &Expr) -> StoreResult<u64>;

    async fn find_one(&self, collection: &str, filter: &Expr) -> StoreResult<Option<Document>> {
        let query = FindQuery {
            filter: filter.clone(),
            limit: Some(1),
            ..Default::default()
        };
        Ok(self.find(collection, &query).await?.into_iter().next())
    }

    /// Insert a new document. Fails with [`StoreError::Duplicate`] if the id exists.
    async fn insert(&self, collection: &str, doc: Document) -> StoreResult<()>;

    /// Replace the document with `id`. Returns false if it does not exist.
    async fn replace(&self, collection: &str, id: &str, doc: Document) -> StoreResult<bool>;

    /// Delete by id. Returns true if a document was removed.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;
}

pub fn document_id(doc: &Document) -> StoreResult<&str> {
    doc.get(ID_FIELD)
        .and_then(Value::as_str)
        .ok_or(StoreError::MissingId)
}

/// Resolve a dotted path inside a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for seg in segments {
        current = current.as_object()?.get(seg)?;
    }
    Some(current)
}

/// Keep `id` and the listed (possibly dotted) fields.
pub fn project(doc: &Document, fields: &[String]) -> Document {
    let mut out = Document::new();
    if let Some(id) = doc.get(ID_FIELD) {
        out.insert(ID_FIELD.to_string(), id.clone());
    }
    for field in fields {
        if let Some(v) = lookup(doc, field) {
            insert_path(&mut out, field, v.clone());
        }
    }
    out
}

fn insert_path(out: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            out.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = out
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Document::new()));
            if let Value::Object(inner) = entry {
                insert_path(inner, rest, value);
            }
        }
    }
}
