//! Catalog module: products, categories and tags over a document store.
//!
//! Each entity is a [`CatalogEntity`](domain::entity::CatalogEntity) served
//! by the generic [`EntityService`](domain::service::EntityService) and the
//! same set of REST routes.

// === PUBLIC CONTRACT ===
pub mod contract;
pub use contract::{error, model};

// === MODULE DEFINITION ===
pub mod module;
pub use module::Catalog;

pub mod config;
pub use config::CatalogConfig;

// === INTERNAL MODULES ===
// Exposed for tests and the composition root.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
