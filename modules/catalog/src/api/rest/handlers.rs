use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Json, Path};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use docstore::Document;
use modkit::{created_json, no_content, ok_json, JsonPage, ListQuery, ProblemResponse, RequestCtx};
use tracing::{error, warn};

use crate::api::rest::error::{from_parts, map_domain_error};
use crate::domain::entity::CatalogEntity;
use crate::domain::error::DomainError;
use crate::domain::service::EntityService;

type Service<E> = Extension<Arc<EntityService<E>>>;

fn fail(e: DomainError, ctx: &RequestCtx, op: &str) -> ProblemResponse {
    match &e {
        DomainError::Storage { .. } => error!(op, error = %e, "catalog request failed"),
        _ => warn!(op, error = %e, "catalog request rejected"),
    }
    map_domain_error(&e, ctx)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>, ctx: &RequestCtx) -> Result<T, ProblemResponse> {
    payload.map(|Json(v)| v).map_err(|rejection| {
        warn!(error = %rejection, "rejecting request body");
        from_parts(
            StatusCode::BAD_REQUEST,
            "INVALID_BODY",
            "Bad Request",
            rejection.body_text(),
            ctx,
        )
    })
}

/// List live records with filtering, sorting and pagination
pub async fn list<E: CatalogEntity>(
    Extension(svc): Service<E>,
    ctx: RequestCtx,
    query: ListQuery,
) -> Result<JsonPage<Document>, ProblemResponse> {
    match svc.list(&ctx, query).await {
        Ok(page) => Ok(Json(page)),
        Err(e) => Err(fail(e, &ctx, "list")),
    }
}

/// List soft-deleted records
pub async fn list_trash<E: CatalogEntity>(
    Extension(svc): Service<E>,
    ctx: RequestCtx,
    query: ListQuery,
) -> Result<JsonPage<Document>, ProblemResponse> {
    match svc.list_trash(&ctx, query).await {
        Ok(page) => Ok(Json(page)),
        Err(e) => Err(fail(e, &ctx, "list_trash")),
    }
}

pub async fn get<E: CatalogEntity>(
    Extension(svc): Service<E>,
    ctx: RequestCtx,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ProblemResponse> {
    match svc.get(&ctx, &id).await {
        Ok(record) => Ok(ok_json(record)),
        Err(e) => Err(fail(e, &ctx, "get")),
    }
}

pub async fn create<E: CatalogEntity>(
    Extension(svc): Service<E>,
    ctx: RequestCtx,
    payload: Result<Json<E::New>, JsonRejection>,
) -> Result<impl IntoResponse, ProblemResponse> {
    let new = body(payload, &ctx)?;
    match svc.create(&ctx, new).await {
        Ok(record) => Ok(created_json(record)),
        Err(e) => Err(fail(e, &ctx, "create")),
    }
}

pub async fn update<E: CatalogEntity>(
    Extension(svc): Service<E>,
    ctx: RequestCtx,
    Path(id): Path<String>,
    payload: Result<Json<E::Patch>, JsonRejection>,
) -> Result<impl IntoResponse, ProblemResponse> {
    let patch = body(payload, &ctx)?;
    match svc.update(&ctx, &id, patch).await {
        Ok(record) => Ok(ok_json(record)),
        Err(e) => Err(fail(e, &ctx, "update")),
    }
}

/// Soft delete
pub async fn delete<E: CatalogEntity>(
    Extension(svc): Service<E>,
    ctx: RequestCtx,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ProblemResponse> {
    match svc.delete(&ctx, &id).await {
        Ok(()) => Ok(no_content()),
        Err(e) => Err(fail(e, &ctx, "delete")),
    }
}

pub async fn purge<E: CatalogEntity>(
    Extension(svc): Service<E>,
    ctx: RequestCtx,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ProblemResponse> {
    match svc.purge(&ctx, &id).await {
        Ok(()) => Ok(no_content()),
        Err(e) => Err(fail(e, &ctx, "purge")),
    }
}

pub async fn restore<E: CatalogEntity>(
    Extension(svc): Service<E>,
    ctx: RequestCtx,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ProblemResponse> {
    match svc.restore(&ctx, &id).await {
        Ok(record) => Ok(ok_json(record)),
        Err(e) => Err(fail(e, &ctx, "restore")),
    }
}
