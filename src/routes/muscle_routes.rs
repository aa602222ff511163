//! Muscle reference data (read-only).

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::error;

use crate::models::Muscle;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

pub fn routes() -> Router<AppState> {
    Router::new().route("/muscles", get(list_muscles))
}

async fn list_muscles(State(state): State<AppState>) -> Result<Json<Vec<Muscle>>, HTTPError> {
    state.store.list_muscles().await.map(Json).map_err(|e| {
        error!("Listing muscles failed: {}", e);
        HTTPError::internal("Error fetching muscles")
    })
}
