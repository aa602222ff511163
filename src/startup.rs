//! Application startup and server initialization.
//!
//! This module handles the creation and configuration of the HTTP server,
//! including initialization of the document store, credential components and routes.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ConfigV1;
use crate::routes;
use crate::state::AppState;
use crate::store::create_store;

/// Initializes and runs the application server.
///
/// Sets up the document store, password hasher, token signer/verifier and
/// HTTP server with configured routes. Binds to the address specified in the
/// configuration and starts serving requests.
///
/// # Errors
///
/// Returns an error if the configuration is unusable, the server fails to bind
/// to the specified address, or it encounters a runtime error during execution.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), Box<dyn std::error::Error>> {
    let store = create_store(&config.store).await;
    if !store.is_persistent() {
        warn!("Using an in-memory store; all data is lost on shutdown.");
    }

    let state = AppState::new(config.clone(), store)?;
    let app = routes::create_router(state);

    info!("Starting server on {}", config.bind_address);
    let listener = TcpListener::bind(&config.bind_address)
        .await
        .map_err(|e| format!("Could not bind to {}: {}", config.bind_address, e))?;

    axum::serve(listener, app).await?;

    Ok(())
}
