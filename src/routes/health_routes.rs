//! Liveness endpoints, with and without the bearer guard.

use crate::auth::AuthenticatedUser;
use crate::state::AppState;
use axum::{routing::get, Router};

/// Registers health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/safe", get(safe))
        .route("/health", get(health_check))
}

async fn index() -> &'static str {
    "Works"
}

/// Same as `/`, but only reachable with a valid bearer token.
async fn safe(_user: AuthenticatedUser) -> &'static str {
    "Works authed"
}

/// Simple health check endpoint.
///
/// Returns a 200 OK status to indicate the service is running.
async fn health_check() -> &'static str {
    "OK"
}
