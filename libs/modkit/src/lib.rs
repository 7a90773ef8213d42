//! # ModKit - HTTP kit for REST modules
//!
//! Shared pieces every REST module uses:
//! - RFC 9457 [`Problem`] responses
//! - the [`ListQuery`] extractor for paginated list endpoints
//! - request-id middleware, tracing spans and the serve loop ([`http`])
//! - the per-request [`RequestCtx`]

pub mod api;
pub mod context;
pub mod http;
pub mod shutdown;

pub use api::problem::{Problem, ProblemResponse, ValidationError, APPLICATION_PROBLEM_JSON};
pub use api::{created_json, no_content, ok_json, JsonPage, ListLimits, ListQuery, SimpleSearch};
pub use context::RequestCtx;
pub use http::{serve, with_middleware, HttpConfig};
pub use shutdown::wait_for_shutdown;
