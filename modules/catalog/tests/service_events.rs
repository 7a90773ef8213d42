//! Service-level tests: domain events and tracing spans.

use std::sync::Arc;

use anyhow::Result;
use catalog::contract::model::{NewTag, Product, Tag, TagPatch};
use catalog::domain::entity::CatalogEntity;
use catalog::domain::error::DomainError;
use catalog::domain::events::{CatalogEvent, CatalogEventKind};
use catalog::domain::ports::EventPublisher;
use catalog::domain::service::EntityService;
use catalog::CatalogConfig;
use docstore::{DocumentStore, MemoryStore, Repository};
use modkit::{ListQuery, RequestCtx};
use parking_lot::Mutex;
use tracing_test::traced_test;

#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<CatalogEvent>>,
}

impl RecordingPublisher {
    fn kinds(&self) -> Vec<CatalogEventKind> {
        self.events.lock().iter().map(|e| e.kind).collect()
    }
}

impl EventPublisher<CatalogEvent> for RecordingPublisher {
    fn publish(&self, event: &CatalogEvent) {
        self.events.lock().push(event.clone());
    }
}

fn tag_service() -> (EntityService<Tag>, Arc<RecordingPublisher>) {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let cfg = CatalogConfig::default();
    let repo = Repository::new(store, Tag::entity_config(&cfg));
    let events = Arc::new(RecordingPublisher::default());
    let svc = EntityService::new(Arc::new(repo), events.clone(), cfg.list_limits());
    (svc, events)
}

fn new_tag(name: &str, slug: &str) -> NewTag {
    NewTag {
        name: name.into(),
        slug: slug.into(),
    }
}

#[tokio::test]
async fn lifecycle_publishes_events_in_order() -> Result<()> {
    let (svc, events) = tag_service();
    let ctx = RequestCtx::internal();

    let tag = svc.create(&ctx, new_tag("Red", "red")).await?;
    svc.update(
        &ctx,
        &tag.id,
        TagPatch {
            name: Some("Crimson".into()),
            ..Default::default()
        },
    )
    .await?;
    svc.delete(&ctx, &tag.id).await?;
    svc.restore(&ctx, &tag.id).await?;
    svc.purge(&ctx, &tag.id).await?;

    assert_eq!(
        events.kinds(),
        vec![
            CatalogEventKind::Created,
            CatalogEventKind::Updated,
            CatalogEventKind::Deleted,
            CatalogEventKind::Restored,
            CatalogEventKind::Purged,
        ]
    );
    assert!(events.events.lock().iter().all(|e| e.id == tag.id && e.collection == "tags"));
    Ok(())
}

#[tokio::test]
async fn failed_operations_publish_nothing() {
    let (svc, events) = tag_service();
    let ctx = RequestCtx::internal();

    assert!(matches!(
        svc.create(&ctx, new_tag("", "x")).await,
        Err(DomainError::Validation { .. })
    ));
    assert!(matches!(
        svc.delete(&ctx, "missing").await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(events.kinds().is_empty());
}

#[tokio::test]
async fn restore_refuses_to_duplicate_a_live_unique_value() -> Result<()> {
    let (svc, _) = tag_service();
    let ctx = RequestCtx::internal();

    let old = svc.create(&ctx, new_tag("Blue", "blue")).await?;
    svc.delete(&ctx, &old.id).await?;
    // The slug is free again once the first tag is in the trash.
    svc.create(&ctx, new_tag("Blue", "blue")).await?;

    let err = svc.restore(&ctx, &old.id).await.unwrap_err();
    assert!(matches!(err, DomainError::AlreadyExists { .. }));
    Ok(())
}

#[tokio::test]
async fn trash_lists_only_deleted_records() -> Result<()> {
    let (svc, _) = tag_service();
    let ctx = RequestCtx::internal();
    for (name, slug) in [("A", "a"), ("B", "b"), ("C", "c")] {
        svc.create(&ctx, new_tag(name, slug)).await?;
    }
    let live = svc.list(&ctx, ListQuery::default()).await?;
    let b = live
        .data
        .iter()
        .find(|d| d["slug"] == "b")
        .and_then(|d| d["id"].as_str())
        .map(str::to_string)
        .unwrap();
    svc.delete(&ctx, &b).await?;

    let trash = svc.list_trash(&ctx, ListQuery::default()).await?;
    assert_eq!(trash.data.len(), 1);
    assert_eq!(trash.pagination.total_rows, 1);
    let live = svc.list(&ctx, ListQuery::default()).await?;
    assert_eq!(live.pagination.total_rows, 2);
    Ok(())
}

#[traced_test]
#[tokio::test]
async fn instrumented_methods_run_under_a_subscriber() {
    let (svc, _) = tag_service();
    let ctx = RequestCtx::new("rid-span", "/tags");
    let created = svc.create(&ctx, new_tag("Green", "green")).await.unwrap();
    let fetched = svc.get(&ctx, &created.id).await.unwrap();
    assert_eq!(fetched, created);
    let page = svc.list(&ctx, ListQuery::default()).await.unwrap();
    assert_eq!(page.pagination.total_filtered_rows, 1);
}

#[test]
fn products_filter_on_their_own_fields() {
    let cfg = Product::entity_config(&CatalogConfig::default());
    let allowed = cfg.allowed_fields.unwrap();
    assert!(allowed.contains("categoryId"));
    assert!(!allowed.contains("slug"));
}
