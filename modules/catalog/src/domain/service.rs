use std::marker::PhantomData;
use std::sync::Arc;

use docstore::{DataAccess, Document, PageQuery};
use modkit::{ListLimits, ListQuery, RequestCtx};
use query_core::{FilterDocument, Paginated};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::domain::entity::CatalogEntity;
use crate::domain::error::DomainError;
use crate::domain::events::{CatalogEvent, CatalogEventKind};
use crate::domain::ports::EventPublisher;

/// Domain service for one catalog entity.
/// Depends only on the storage capability and the event port.
pub struct EntityService<E: CatalogEntity> {
    repo: Arc<dyn DataAccess>,
    events: Arc<dyn EventPublisher<CatalogEvent>>,
    limits: ListLimits,
    _entity: PhantomData<fn() -> E>,
}

impl<E: CatalogEntity> Clone for EntityService<E> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            events: self.events.clone(),
            limits: self.limits,
            _entity: PhantomData,
        }
    }
}

impl<E: CatalogEntity> EntityService<E> {
    pub fn new(
        repo: Arc<dyn DataAccess>,
        events: Arc<dyn EventPublisher<CatalogEvent>>,
        limits: ListLimits,
    ) -> Self {
        Self {
            repo,
            events,
            limits,
            _entity: PhantomData,
        }
    }

    pub fn limits(&self) -> &ListLimits {
        &self.limits
    }

    /// List live records.
    #[instrument(
        name = "catalog.service.list",
        skip(self, ctx, query),
        fields(collection = E::COLLECTION, request_id = %ctx.request_id())
    )]
    pub async fn list(
        &self,
        ctx: &RequestCtx,
        query: ListQuery,
    ) -> Result<Paginated<Document>, DomainError> {
        self.run_list(query, None).await
    }

    /// List soft-deleted records.
    #[instrument(
        name = "catalog.service.list_trash",
        skip(self, ctx, query),
        fields(collection = E::COLLECTION, request_id = %ctx.request_id())
    )]
    pub async fn list_trash(
        &self,
        ctx: &RequestCtx,
        query: ListQuery,
    ) -> Result<Paginated<Document>, DomainError> {
        let mut trash = FilterDocument::new();
        trash.insert(self.repo.config().soft_delete_field.clone(), Value::Bool(true));
        self.run_list(query, Some(Value::Object(trash).to_string()))
            .await
    }

    async fn run_list(
        &self,
        query: ListQuery,
        contextual: Option<String>,
    ) -> Result<Paginated<Document>, DomainError> {
        let page_query = PageQuery {
            base_filter: FilterDocument::new(),
            page: query.page_request(&self.limits),
            advanced: query.advanced_filter(),
            options: query.options,
            contextual,
        };
        let page = self.repo.find_paginated(&page_query).await?;
        debug!(
            returned = page.data.len(),
            total_filtered_rows = page.pagination.total_filtered_rows,
            "listed records"
        );
        Ok(page)
    }

    #[instrument(
        name = "catalog.service.get",
        skip(self, ctx),
        fields(collection = E::COLLECTION, request_id = %ctx.request_id())
    )]
    pub async fn get(&self, ctx: &RequestCtx, id: &str) -> Result<E, DomainError> {
        debug!("Getting record by id");
        let doc = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(E::NAME, id))?;
        decode(doc)
    }

    #[instrument(
        name = "catalog.service.create",
        skip(self, ctx, new),
        fields(collection = E::COLLECTION, request_id = %ctx.request_id())
    )]
    pub async fn create(&self, ctx: &RequestCtx, new: E::New) -> Result<E, DomainError> {
        info!("Creating record");
        E::validate_new(&new)?;
        let doc = encode(&new)?;
        self.ensure_unique(&doc, None).await?;

        let created = self.repo.create(doc).await?;
        let record: E = decode(created.clone())?;
        self.publish(CatalogEventKind::Created, &created);
        info!(id = ?created.get("id"), "Successfully created record");
        Ok(record)
    }

    #[instrument(
        name = "catalog.service.update",
        skip(self, ctx, patch),
        fields(collection = E::COLLECTION, request_id = %ctx.request_id())
    )]
    pub async fn update(&self, ctx: &RequestCtx, id: &str, patch: E::Patch) -> Result<E, DomainError> {
        info!("Updating record");
        E::validate_patch(&patch)?;
        let patch = encode(&patch)?;

        let current = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(E::NAME, id))?;
        let changed: Document = patch
            .iter()
            .filter(|(k, v)| current.get(k.as_str()) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.ensure_unique(&changed, Some(id)).await?;

        let updated = self
            .repo
            .update(id, patch)
            .await?
            .ok_or_else(|| DomainError::not_found(E::NAME, id))?;
        let record: E = decode(updated.clone())?;
        self.publish(CatalogEventKind::Updated, &updated);
        info!("Successfully updated record");
        Ok(record)
    }

    /// Soft delete: the record moves to the trash.
    #[instrument(
        name = "catalog.service.delete",
        skip(self, ctx),
        fields(collection = E::COLLECTION, request_id = %ctx.request_id())
    )]
    pub async fn delete(&self, ctx: &RequestCtx, id: &str) -> Result<(), DomainError> {
        info!("Deleting record");
        let deleted = self
            .repo
            .soft_delete(id)
            .await?
            .ok_or_else(|| DomainError::not_found(E::NAME, id))?;
        self.publish(CatalogEventKind::Deleted, &deleted);
        info!("Successfully deleted record");
        Ok(())
    }

    /// Hard delete, whether or not the record is in the trash.
    #[instrument(
        name = "catalog.service.purge",
        skip(self, ctx),
        fields(collection = E::COLLECTION, request_id = %ctx.request_id())
    )]
    pub async fn purge(&self, ctx: &RequestCtx, id: &str) -> Result<(), DomainError> {
        info!("Purging record");
        if !self.repo.delete(id).await? {
            return Err(DomainError::not_found(E::NAME, id));
        }
        self.events
            .publish(&CatalogEvent::now(CatalogEventKind::Purged, E::COLLECTION, id));
        info!("Successfully purged record");
        Ok(())
    }

    /// Bring a record back from the trash. Fails with a conflict if a live
    /// record took one of its unique values in the meantime.
    #[instrument(
        name = "catalog.service.restore",
        skip(self, ctx),
        fields(collection = E::COLLECTION, request_id = %ctx.request_id())
    )]
    pub async fn restore(&self, ctx: &RequestCtx, id: &str) -> Result<E, DomainError> {
        info!("Restoring record");
        let current = self
            .repo
            .find_by_id_any(id)
            .await?
            .ok_or_else(|| DomainError::not_found(E::NAME, id))?;
        self.ensure_unique(&current, Some(id)).await?;

        let restored = self
            .repo
            .restore(id)
            .await?
            .ok_or_else(|| DomainError::not_found(E::NAME, id))?;
        let record: E = decode(restored.clone())?;
        self.publish(CatalogEventKind::Restored, &restored);
        info!("Successfully restored record");
        Ok(record)
    }

    // --- helpers ---

    /// Checks the unique fields present in `doc` against live records.
    async fn ensure_unique(&self, doc: &Document, exclude_id: Option<&str>) -> Result<(), DomainError> {
        for field in E::UNIQUE_FIELDS {
            let Some(value) = doc.get(*field).filter(|v| !v.is_null()) else {
                continue;
            };
            let mut filter = FilterDocument::new();
            filter.insert((*field).to_string(), value.clone());
            if self.repo.exists_where(&filter, exclude_id).await? {
                let shown = value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                return Err(DomainError::already_exists(E::NAME, *field, shown));
            }
        }
        Ok(())
    }

    fn publish(&self, kind: CatalogEventKind, doc: &Document) {
        let id = doc.get("id").and_then(Value::as_str).unwrap_or_default();
        self.events
            .publish(&CatalogEvent::now(kind, E::COLLECTION, id));
    }
}

fn encode<T: Serialize>(payload: &T) -> Result<Document, DomainError> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(_) => Err(DomainError::validation("body", "must be a JSON object")),
        Err(e) => Err(DomainError::validation("body", e.to_string())),
    }
}

fn decode<E: CatalogEntity>(doc: Document) -> Result<E, DomainError> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|e| DomainError::storage(format!("stored {} is malformed: {e}", E::NAME)))
}
