use std::sync::Arc;

use axum::Router;
use docstore::{DocumentStore, Repository};
use tracing::info;

use crate::api::rest::routes;
use crate::config::CatalogConfig;
use crate::contract::model::{Category, Product, Tag};
use crate::domain::entity::CatalogEntity;
use crate::domain::events::CatalogEvent;
use crate::domain::ports::EventPublisher;
use crate::domain::service::EntityService;
use crate::infra::events::LoggingEventPublisher;

/// The catalog's wired services, one per entity.
#[derive(Clone)]
pub struct Catalog {
    pub products: Arc<EntityService<Product>>,
    pub categories: Arc<EntityService<Category>>,
    pub tags: Arc<EntityService<Tag>>,
}

impl Catalog {
    /// Wire repositories and services over `store`.
    pub fn build(
        store: Arc<dyn DocumentStore>,
        cfg: &CatalogConfig,
        events: Arc<dyn EventPublisher<CatalogEvent>>,
    ) -> Self {
        info!(
            backend = store.backend(),
            default_page_size = cfg.default_page_size,
            max_page_size = cfg.max_page_size,
            "Initializing catalog module"
        );
        Self {
            products: Arc::new(service::<Product>(&store, cfg, &events)),
            categories: Arc::new(service::<Category>(&store, cfg, &events)),
            tags: Arc::new(service::<Tag>(&store, cfg, &events)),
        }
    }

    /// [`Catalog::build`] with domain events going to the log.
    pub fn with_logging_events(store: Arc<dyn DocumentStore>, cfg: &CatalogConfig) -> Self {
        Self::build(store, cfg, Arc::new(LoggingEventPublisher))
    }

    pub fn register_rest(&self, router: Router) -> Router {
        let router = routes::register_routes(router, self.products.clone());
        let router = routes::register_routes(router, self.categories.clone());
        let router = routes::register_routes(router, self.tags.clone());
        info!("Catalog REST routes registered successfully");
        router
    }
}

fn service<E: CatalogEntity>(
    store: &Arc<dyn DocumentStore>,
    cfg: &CatalogConfig,
    events: &Arc<dyn EventPublisher<CatalogEvent>>,
) -> EntityService<E> {
    let repo = Repository::new(store.clone(), E::entity_config(cfg));
    EntityService::new(Arc::new(repo), events.clone(), cfg.list_limits())
}
