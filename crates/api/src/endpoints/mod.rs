//! API endpoints.

mod health;
mod polls;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/polls", polls::router())
        .nest("/health", health::router())
}
