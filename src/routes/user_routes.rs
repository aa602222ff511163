//! Registration and account maintenance.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::auth_routes::Credentials;
use super::{json_body, parse_id};
use crate::models::User;
use crate::state::AppState;
use crate::store::StoreError;
use crate::utils::http_helpers::HTTPError;

const USERNAME_TAKEN: &str = "Username already exists";

/// Registers user management routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/:id", put(update_password).delete(delete_user))
}

#[derive(Deserialize)]
struct PasswordChange {
    password: String,
}

/// Creates an account. Responds with the stored record.
async fn register(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), HTTPError> {
    const FAILED: &str = "Registration failed";
    let credentials = json_body(body, FAILED)?;

    let existing = state
        .store
        .find_user_by_username(&credentials.username)
        .await
        .map_err(|e| {
            error!("Username lookup failed during registration: {}", e);
            HTTPError::bad_request(FAILED)
        })?;
    if existing.is_some() {
        return Err(HTTPError::bad_request(USERNAME_TAKEN));
    }

    let password_hash = state
        .hasher
        .spawn_hash(&credentials.password)
        .await
        .map_err(|e| {
            error!("{}", e);
            HTTPError::internal(FAILED)
        })?;

    let user = User::new(
        ObjectId::new().to_hex(),
        credentials.username,
        password_hash,
    );

    match state.store.insert_user(&user).await {
        Ok(()) => {
            info!("Registered user '{}' ({})", user.username, user.id);
            Ok((StatusCode::CREATED, Json(user)))
        }
        // Lost a race with a concurrent registration of the same name.
        Err(StoreError::Duplicate(what)) => {
            warn!("Registration rejected by store: duplicate {}", what);
            Err(HTTPError::bad_request(USERNAME_TAKEN))
        }
        Err(e) => {
            error!("Registration failed for '{}': {}", user.username, e);
            Err(HTTPError::bad_request(FAILED))
        }
    }
}

/// Replaces a user's password with a fresh hash of the supplied one.
async fn update_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<PasswordChange>, JsonRejection>,
) -> Result<Json<Value>, HTTPError> {
    const FAILED: &str = "Update failed";
    let id = parse_id(&id, FAILED)?;
    let change = json_body(body, FAILED)?;

    let password_hash = state
        .hasher
        .spawn_hash(&change.password)
        .await
        .map_err(|e| {
            error!("{}", e);
            HTTPError::internal(FAILED)
        })?;

    match state.store.update_user_password(&id, &password_hash).await {
        Ok(Some(_)) => {
            info!("Password updated for user {}", id);
            Ok(Json(json!({ "message": "Password updated" })))
        }
        Ok(None) => Err(HTTPError::not_found("User not found")),
        Err(e) => {
            error!("Password update failed for {}: {}", id, e);
            Err(HTTPError::bad_request(FAILED))
        }
    }
}

/// Deletes the account. Workouts it references are left in place.
async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, HTTPError> {
    const FAILED: &str = "Deletion failed";
    let id = parse_id(&id, FAILED)?;

    match state.store.delete_user(&id).await {
        Ok(Some(user)) => {
            info!("Deleted user '{}' ({})", user.username, id);
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(None) => Err(HTTPError::not_found("User not found")),
        Err(e) => {
            error!("Deleting user {} failed: {}", id, e);
            Err(HTTPError::bad_request(FAILED))
        }
    }
}
