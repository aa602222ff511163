//! Credential exchange and the caller's own profile.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{json_body, parse_id};
use crate::auth::AuthenticatedUser;
use crate::models::User;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Same text for every failure so callers cannot tell an unknown
/// username from a wrong password.
const AUTH_FAILED: &str = "Authentication failed";

/// Registers authentication routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth", post(authenticate))
        .route("/profile", get(profile))
}

#[derive(Deserialize)]
pub(super) struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Exchanges a username and password for a bearer token.
async fn authenticate(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<TokenResponse>, HTTPError> {
    let credentials = json_body(body, AUTH_FAILED)?;
    let user = state
        .store
        .find_user_by_username(&credentials.username)
        .await
        .map_err(|e| {
            error!("Credential lookup failed: {}", e);
            HTTPError::internal(AUTH_FAILED)
        })?;

    let user = match user {
        Some(user) => user,
        None => {
            info!("Authentication failed: unknown user '{}'", credentials.username);
            return Err(HTTPError::unauthorized(AUTH_FAILED));
        }
    };

    if !state
        .hasher
        .spawn_verify(&credentials.password, &user.password)
        .await
    {
        warn!("Authentication failed: wrong password for '{}'", user.username);
        return Err(HTTPError::unauthorized(AUTH_FAILED));
    }

    let token = state.issuer.issue(&user.id).map_err(|e| {
        error!("Token issuance failed for user {}: {}", user.id, e);
        HTTPError::internal(AUTH_FAILED)
    })?;

    info!("User '{}' authenticated", user.username);
    Ok(Json(TokenResponse { token }))
}

/// Returns the stored record of the token's user.
async fn profile(
    caller: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<User>, HTTPError> {
    let id = parse_id(&caller.user_id, "No user found")?;

    match state.store.get_user(&id).await {
        Ok(Some(user)) => Ok(Json(user)),
        Ok(None) => Err(HTTPError::not_found("User not found")),
        Err(e) => {
            error!("Profile lookup failed for {}: {}", id, e);
            Err(HTTPError::bad_request("No user found"))
        }
    }
}
