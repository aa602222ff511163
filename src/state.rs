//! Shared application state.
//!
//! Contains the state that is shared across all request handlers:
//! configuration, the document store, and the credential/token components
//! built once from configuration at startup.

use crate::auth::{PasswordHasher, TokenIssuer, TokenVerifier};
use crate::config::ConfigV1;
use crate::store::Store;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Everything in here is read-only after startup; handlers only mutate data
/// through the store.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Users, exercises, workouts and muscles.
    pub store: Arc<dyn Store>,
    /// Argon2id hashing with the configured cost.
    pub hasher: Arc<PasswordHasher>,
    /// Signs bearer tokens with the configured secret.
    pub issuer: Arc<TokenIssuer>,
    /// Checks bearer tokens on guarded routes.
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    /// Builds the state, deriving the credential components from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the password hashing parameters are invalid.
    pub fn new(config: Arc<ConfigV1>, store: Arc<dyn Store>) -> Result<Self, String> {
        let hasher = Arc::new(PasswordHasher::new(&config.password)?);
        let issuer = Arc::new(TokenIssuer::new(&config.jwt));
        let verifier = Arc::new(TokenVerifier::new(&config.jwt));

        Ok(AppState {
            config,
            store,
            hasher,
            issuer,
            verifier,
        })
    }
}
