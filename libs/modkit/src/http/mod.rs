//! HTTP server plumbing shared by every REST module.

pub mod request_id;
pub mod server;

pub use request_id::{XRequestId, REQUEST_ID_HEADER};
pub use server::{health_check, serve, with_middleware, HttpConfig};
