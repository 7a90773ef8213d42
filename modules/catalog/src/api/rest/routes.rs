use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::{Extension, Router};
use tracing::debug;

use crate::api::rest::handlers;
use crate::domain::entity::CatalogEntity;
use crate::domain::service::EntityService;

/// Mount the CRUD routes of `E` under `E::PATH`.
pub fn register_routes<E: CatalogEntity>(router: Router, service: Arc<EntityService<E>>) -> Router {
    let routes = Router::new()
        .route("/", get(handlers::list::<E>).post(handlers::create::<E>))
        .route("/trash", get(handlers::list_trash::<E>))
        .route(
            "/{id}",
            get(handlers::get::<E>)
                .patch(handlers::update::<E>)
                .delete(handlers::delete::<E>),
        )
        .route("/{id}/purge", delete(handlers::purge::<E>))
        .route("/{id}/restore", post(handlers::restore::<E>))
        .layer(Extension(service));

    debug!(path = E::PATH, "registered entity routes");
    router.nest(E::PATH, routes)
}
