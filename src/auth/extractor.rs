use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use http::request::Parts;
use tracing::{debug, warn};

use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// The identity resolved from a valid bearer token.
///
/// Taking this as a handler argument guards the route: on any verification
/// failure the request is answered with 401 and the handler never runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = HTTPError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<AuthenticatedUser, HTTPError> {
        // A header that is not valid UTF-8 is treated as absent.
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        match state.verifier.verify_header(auth_header) {
            Ok(user_id) => {
                debug!("Bearer token accepted for user_id='{}'", user_id);
                Ok(AuthenticatedUser { user_id })
            }
            Err(e) => {
                warn!("Rejected request to {}: {}", parts.uri.path(), e);
                Err(HTTPError::unauthorized(e.message()))
            }
        }
    }
}
