//! Router finishing and the serve loop.

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;

use super::request_id::{create_trace_layer, header, push_req_id_to_extensions, MakeReqId};

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub body_limit_bytes: usize,
    pub cors_enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            body_limit_bytes: 1024 * 1024,
            cors_enabled: false,
        }
    }
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Adds `/health` and the global middleware stack to `router`.
///
/// Request order, outermost first: set request id, propagate it to the
/// response, push it to extensions, trace, timeout, CORS, body limit.
pub fn with_middleware(router: Router, cfg: &HttpConfig) -> Router {
    let x_request_id = header();

    let mut router = router
        .route("/health", get(health_check))
        .layer(RequestBodyLimitLayer::new(cfg.body_limit_bytes));
    if cfg.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeReqId))
            .layer(PropagateRequestIdLayer::new(x_request_id))
            .layer(from_fn(push_req_id_to_extensions))
            .layer(create_trace_layer())
            .layer(TimeoutLayer::new(cfg.timeout)),
    )
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("listener has no local address")?;
    tracing::info!("HTTP server bound on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("HTTP server shutting down gracefully");
        })
        .await
        .map_err(|e| anyhow::anyhow!(e))
}
