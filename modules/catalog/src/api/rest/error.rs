use axum::http::StatusCode;
use modkit::{Problem, ProblemResponse, RequestCtx, ValidationError};

use crate::domain::error::DomainError;

/// Helper to create a ProblemResponse with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    ctx: &RequestCtx,
) -> ProblemResponse {
    Problem::coded(status, code, title, detail)
        .for_request(ctx)
        .into()
}

/// Map domain error to RFC9457 Problem response
pub fn map_domain_error(e: &DomainError, ctx: &RequestCtx) -> ProblemResponse {
    match e {
        DomainError::NotFound { .. } => {
            from_parts(StatusCode::NOT_FOUND, "NOT_FOUND", "Not Found", e.to_string(), ctx)
        }
        DomainError::AlreadyExists { .. } => {
            from_parts(StatusCode::CONFLICT, "CONFLICT", "Conflict", e.to_string(), ctx)
        }
        DomainError::Validation { field, message } => {
            let ProblemResponse(problem) = from_parts(
                StatusCode::BAD_REQUEST,
                "VALIDATION",
                "Bad Request",
                e.to_string(),
                ctx,
            );
            ProblemResponse(
                problem.with_errors(vec![ValidationError::new(format!("/{field}"), message.clone())]),
            )
        }
        DomainError::Storage { .. } => {
            // Details are logged by the handler, not exposed.
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "Internal Server Error",
                "An internal error occurred",
                ctx,
            )
        }
    }
}
