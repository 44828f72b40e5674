//! HTTP API layer for pollstar-rs.
//!
//! This crate provides the REST API:
//!
//! - **Endpoints**: Session-scoped poll management and activation
//! - **Middleware**: Shared application state
//! - **Responses**: Uniform success/error envelope
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
