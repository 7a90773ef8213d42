//! SQLite-backed document store: one `documents` table, JSON bodies queried
//! with `json_extract`.

mod condition;
pub mod entity;
pub mod migrations;

use async_trait::async_trait;
use query_core::Expr;
use sea_orm::sea_query::Expr as SqlExpr;
use sea_orm::{
    ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr,
};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::store::{document_id, project, Document, DocumentStore, FindQuery, ID_FIELD};
use condition::{expr_to_condition, field_expr, order};
use entity as documents;
use migrations::Migrator;

#[derive(Clone)]
pub struct SqlDocumentStore {
    conn: DatabaseConnection,
}

impl SqlDocumentStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Connect and run pending migrations.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let mut opts = ConnectOptions::new(url.to_owned());
        opts.sqlx_logging(false);
        if url.contains(":memory:") || url.contains("mode=memory") {
            // in-memory databases are per connection
            opts.max_connections(1);
        }
        let conn = Database::connect(opts).await?;
        Migrator::up(&conn, None).await?;
        info!(url, "sqlite document store ready");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    fn select(&self, collection: &str, filter: &Expr) -> StoreResult<Select<documents::Entity>> {
        let select =
            documents::Entity::find().filter(documents::Column::Collection.eq(collection));
        if filter.is_all() {
            return Ok(select);
        }
        Ok(select.filter(expr_to_condition(filter)?))
    }
}

fn into_document(model: documents::Model) -> StoreResult<Document> {
    match model.body {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Corrupt(format!(
            "{}/{} body is {}",
            model.collection,
            model.id,
            kind(&other)
        ))),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl DocumentStore for SqlDocumentStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> StoreResult<Vec<Document>> {
        let mut select = self.select(collection, &query.filter)?;
        for key in &query.sort {
            select = select.order_by(field_expr(&key.field), order(key.dir));
        }
        if query.skip > 0 {
            // SQLite only accepts OFFSET together with LIMIT
            let limit = query.limit.unwrap_or(i64::MAX as u64);
            select = select.offset(query.skip).limit(limit);
        } else if let Some(limit) = query.limit {
            select = select.limit(limit);
        }

        let rows = select.all(&self.conn).await?;
        debug!(collection, returned = rows.len(), "sqlite find");
        rows.into_iter()
            .map(|m| {
                let doc = into_document(m)?;
                Ok(match &query.projection {
                    Some(fields) => project(&doc, fields),
                    None => doc,
                })
            })
            .collect()
    }

    async fn count(&self, collection: &str, filter: &Expr) -> StoreResult<u64> {
        Ok(self.select(collection, filter)?.count(&self.conn).await?)
    }

    async fn insert(&self, collection: &str, doc: Document) -> StoreResult<()> {
        let id = document_id(&doc)?.to_string();
        let model = documents::ActiveModel {
            collection: Set(collection.to_string()),
            id: Set(id.clone()),
            body: Set(Value::Object(doc)),
        };
        match documents::Entity::insert(model)
            .exec_without_returning(&self.conn)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(StoreError::Duplicate {
                    collection: collection.to_string(),
                    id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(&self, collection: &str, id: &str, mut doc: Document) -> StoreResult<bool> {
        doc.insert(ID_FIELD.to_string(), id.into());
        let res = documents::Entity::update_many()
            .col_expr(documents::Column::Body, SqlExpr::value(Value::Object(doc)))
            .filter(documents::Column::Collection.eq(collection))
            .filter(documents::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(res.rows_affected > 0)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let res = documents::Entity::delete_many()
            .filter(documents::Column::Collection.eq(collection))
            .filter(documents::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(res.rows_affected > 0)
    }
}
