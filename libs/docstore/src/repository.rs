//! Generic data access over a [`DocumentStore`] for one configured entity.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use query_core::{to_expr, translate, Expr, FilterDocument, Paginated};
use serde_json::Value;
use tracing::debug;

use crate::entity::EntityConfig;
use crate::error::StoreResult;
use crate::paginate::{find_paginated, PageQuery};
use crate::store::{Document, DocumentStore, ID_FIELD};

pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// What a service needs from storage for one entity.
#[async_trait]
pub trait DataAccess: Send + Sync {
    fn config(&self) -> &EntityConfig;

    async fn find_paginated(&self, query: &PageQuery) -> StoreResult<Paginated<Document>>;

    /// Lookup under the permanent filter (soft-deleted records are invisible).
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Document>>;

    /// Lookup ignoring the permanent filter.
    async fn find_by_id_any(&self, id: &str) -> StoreResult<Option<Document>>;

    /// Insert a new record. An `id` is generated when absent; timestamps and
    /// the deletion flag are set here.
    async fn create(&self, doc: Document) -> StoreResult<Document>;

    /// Shallow-merge `patch` into a visible record. `None` if not found.
    async fn update(&self, id: &str, patch: Document) -> StoreResult<Option<Document>>;

    /// Remove the record for good, whatever its deletion state.
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    async fn soft_delete(&self, id: &str) -> StoreResult<Option<Document>>;

    async fn restore(&self, id: &str) -> StoreResult<Option<Document>>;

    /// Whether a visible record matches `filter`, optionally ignoring one id.
    async fn exists_where(
        &self,
        filter: &FilterDocument,
        exclude_id: Option<&str>,
    ) -> StoreResult<bool>;
}

#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    config: EntityConfig,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>, config: EntityConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    fn visible(&self, extra: Expr) -> StoreResult<Expr> {
        let permanent = to_expr(&translate(&self.config.permanent_filter)?)?;
        Ok(Expr::all_of(vec![permanent, extra]))
    }

    /// Fields callers may not set through `create`/`update`.
    fn is_managed(&self, key: &str) -> bool {
        key == ID_FIELD
            || key == CREATED_AT_FIELD
            || key == UPDATED_AT_FIELD
            || key == self.config.soft_delete_field
            || key == self.config.deleted_at_field
    }

    async fn write_back(&self, id: &str, doc: Document) -> StoreResult<Option<Document>> {
        let replaced = self
            .store
            .replace(&self.config.collection, id, doc.clone())
            .await?;
        Ok(replaced.then_some(doc))
    }
}

#[async_trait]
impl DataAccess for Repository {
    fn config(&self) -> &EntityConfig {
        &self.config
    }

    async fn find_paginated(&self, query: &PageQuery) -> StoreResult<Paginated<Document>> {
        find_paginated(
            self.store.as_ref(),
            &self.config,
            &self.config.parser(),
            query,
        )
        .await
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Document>> {
        let filter = self.visible(Expr::eq(ID_FIELD, id))?;
        self.store.find_one(&self.config.collection, &filter).await
    }

    async fn find_by_id_any(&self, id: &str) -> StoreResult<Option<Document>> {
        self.store
            .find_one(&self.config.collection, &Expr::eq(ID_FIELD, id))
            .await
    }

    async fn create(&self, doc: Document) -> StoreResult<Document> {
        let id = match doc.get(ID_FIELD).and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };
        let mut out: Document = doc.into_iter().filter(|(k, _)| !self.is_managed(k)).collect();
        let ts = now();
        out.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        out.insert(self.config.soft_delete_field.clone(), Value::Bool(false));
        out.insert(CREATED_AT_FIELD.to_string(), ts.clone());
        out.insert(UPDATED_AT_FIELD.to_string(), ts);

        self.store.insert(&self.config.collection, out.clone()).await?;
        debug!(collection = %self.config.collection, %id, "created document");
        Ok(out)
    }

    async fn update(&self, id: &str, patch: Document) -> StoreResult<Option<Document>> {
        let Some(mut doc) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        for (k, v) in patch {
            if !self.is_managed(&k) {
                doc.insert(k, v);
            }
        }
        doc.insert(UPDATED_AT_FIELD.to_string(), now());
        self.write_back(id, doc).await
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.store.delete(&self.config.collection, id).await
    }

    async fn soft_delete(&self, id: &str) -> StoreResult<Option<Document>> {
        let Some(mut doc) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        let ts = now();
        doc.insert(self.config.soft_delete_field.clone(), Value::Bool(true));
        doc.insert(self.config.deleted_at_field.clone(), ts.clone());
        doc.insert(UPDATED_AT_FIELD.to_string(), ts);
        self.write_back(id, doc).await
    }

    async fn restore(&self, id: &str) -> StoreResult<Option<Document>> {
        let Some(mut doc) = self.find_by_id_any(id).await? else {
            return Ok(None);
        };
        doc.insert(self.config.soft_delete_field.clone(), Value::Bool(false));
        doc.insert(self.config.deleted_at_field.clone(), Value::Null);
        doc.insert(UPDATED_AT_FIELD.to_string(), now());
        self.write_back(id, doc).await
    }

    async fn exists_where(
        &self,
        filter: &FilterDocument,
        exclude_id: Option<&str>,
    ) -> StoreResult<bool> {
        let mut parts = vec![to_expr(&translate(filter)?)?];
        if let Some(id) = exclude_id {
            parts.push(Expr::Compare {
                field: ID_FIELD.to_string(),
                op: query_core::CompareOperator::Ne,
                value: Value::String(id.to_string()),
            });
        }
        let filter = self.visible(Expr::all_of(parts))?;
        Ok(self
            .store
            .find_one(&self.config.collection, &filter)
            .await?
            .is_some())
    }
}
