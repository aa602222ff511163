//! HTTP route definitions and handlers.
//!
//! This module organizes all HTTP endpoints into logical groups:
//! authentication, users, exercises, workouts, muscles and health checks.

mod auth_routes;
mod exercise_routes;
mod health_routes;
mod muscle_routes;
mod user_routes;
mod workout_routes;

use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;
use axum::extract::rejection::JsonRejection;
use axum::{Json, Router};
use mongodb::bson::oid::ObjectId;
use tracing::{debug, warn};

/// Creates the application router with all configured routes.
///
/// Combines all route modules into a single router and attaches
/// the application state for access in handlers.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes::routes())
        .merge(auth_routes::routes())
        .merge(user_routes::routes())
        .merge(exercise_routes::routes())
        .merge(workout_routes::routes())
        .merge(muscle_routes::routes())
        .with_state(state)
}

/// Parses a document id from the path or body. A malformed id is a client
/// error reported with the endpoint's own failure message.
fn parse_id(raw: &str, failure_message: &str) -> Result<ObjectId, HTTPError> {
    ObjectId::parse_str(raw).map_err(|e| {
        debug!("Rejected malformed id '{}': {}", raw, e);
        HTTPError::bad_request(failure_message)
    })
}

/// Unwraps a JSON request body. Anything axum could not turn into `T` is a
/// client error reported with the endpoint's own failure message.
fn json_body<T>(
    body: Result<Json<T>, JsonRejection>,
    failure_message: &str,
) -> Result<T, HTTPError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            warn!(
                "Rejected request body ({}): {}",
                rejection.status(),
                rejection.body_text()
            );
            Err(HTTPError::bad_request(failure_message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_parse_id() {
        let id = ObjectId::new();
        assert_eq!(parse_id(&id.to_hex(), "x").unwrap(), id);

        let err = parse_id("123", "Deletion failed").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Deletion failed");
    }
}
