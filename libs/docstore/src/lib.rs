//! Document storage for list-style CRUD services.
//!
//! A [`DocumentStore`] holds JSON documents in named collections. Two
//! backends exist: [`MemoryStore`] and the SQLite-backed
//! [`SqlDocumentStore`]. [`find_paginated`] is the single list-query entry
//! point; [`Repository`] wraps it with the usual by-id operations and soft
//! delete.

pub mod connect;
pub mod entity;
pub mod error;
pub mod memory;
pub mod paginate;
pub mod repository;
pub mod sql;
pub mod store;

pub use connect::connect;
pub use entity::EntityConfig;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use paginate::{find_paginated, sort_keys, PageQuery};
pub use repository::{DataAccess, Repository};
pub use sql::SqlDocumentStore;
pub use store::{Document, DocumentStore, FindQuery, ID_FIELD};
