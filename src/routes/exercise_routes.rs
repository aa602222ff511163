//! Exercise catalog.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use tracing::error;

use super::json_body;
use crate::models::Exercise;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

pub fn routes() -> Router<AppState> {
    Router::new().route("/exercises", post(create_exercise).get(list_exercises))
}

#[derive(Deserialize)]
struct NewExercise {
    name: String,
    #[serde(default)]
    description: String,
}

async fn create_exercise(
    State(state): State<AppState>,
    body: Result<Json<NewExercise>, JsonRejection>,
) -> Result<(StatusCode, Json<Exercise>), HTTPError> {
    const FAILED: &str = "Exercise creation failed";
    let body = json_body(body, FAILED)?;
    let exercise = Exercise::new(ObjectId::new().to_hex(), body.name, body.description);

    state.store.insert_exercise(&exercise).await.map_err(|e| {
        error!("Creating exercise '{}' failed: {}", exercise.name, e);
        HTTPError::bad_request(FAILED)
    })?;

    Ok((StatusCode::CREATED, Json(exercise)))
}

async fn list_exercises(State(state): State<AppState>) -> Result<Json<Vec<Exercise>>, HTTPError> {
    state.store.list_exercises().await.map(Json).map_err(|e| {
        error!("Listing exercises failed: {}", e);
        HTTPError::internal("Server error")
    })
}
