//! Per-request context handed explicitly from handlers to services.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, OriginalUri};
use axum::http::request::Parts;

use crate::http::XRequestId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestCtx {
    request_id: String,
    path: String,
}

impl RequestCtx {
    pub fn new(request_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            path: path.into(),
        }
    }

    /// Context for calls that do not originate from an HTTP request.
    pub fn internal() -> Self {
        Self::new("internal", "")
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Full request path (before any router nesting), used as the
    /// `instance` of problem responses.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl<S> FromRequestParts<S> for RequestCtx
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .extensions
            .get::<XRequestId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| "n/a".to_string());
        let path = match parts.extensions.get::<OriginalUri>() {
            Some(OriginalUri(uri)) => uri.path().to_string(),
            None => parts.uri.path().to_string(),
        };
        Ok(Self::new(request_id, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn reads_request_id_and_path() {
        let mut req = Request::builder()
            .uri("/products/abc?x=1")
            .body(())
            .unwrap();
        req.extensions_mut().insert(XRequestId("rid-1".into()));
        let (mut parts, _) = req.into_parts();
        let ctx = RequestCtx::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.request_id(), "rid-1");
        assert_eq!(ctx.path(), "/products/abc");
    }

    #[tokio::test]
    async fn missing_request_id_is_placeholder() {
        let (mut parts, _) = Request::builder().uri("/x").body(()).unwrap().into_parts();
        let ctx = RequestCtx::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.request_id(), "n/a");
    }

    #[tokio::test]
    async fn prefers_original_uri_under_nesting() {
        let mut req = Request::builder().uri("/abc").body(()).unwrap();
        req.extensions_mut()
            .insert(OriginalUri("/products/abc".parse().unwrap()));
        let (mut parts, _) = req.into_parts();
        let ctx = RequestCtx::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.path(), "/products/abc");
    }
}
