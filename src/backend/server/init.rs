/**
 * Server Startup
 *
 * Binds both listeners (HTTP mutation API and the event fan-out
 * channel), wires the shared state, and runs until the HTTP server
 * stops. The channel server runs on its own task for the life of the
 * process.
 */

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::backend::realtime::run_sync_channel;
use crate::backend::routes::create_router;
use crate::backend::server::config::{load_store, ServerConfig};
use crate::backend::server::state::AppState;
use crate::backend::store::Store;

/// Build the application state and router around a store.
///
/// Exposed separately from `serve` so tests can boot the same app on
/// ephemeral ports.
pub fn build_app(store: Arc<dyn Store>) -> (axum::Router, AppState) {
    let state = AppState::new(store);
    (create_router(state.clone()), state)
}

/// Run the server with the given configuration until shutdown.
pub async fn serve(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = load_store(&config).await;
    let (router, state) = build_app(store);

    let sync_listener = TcpListener::bind(("0.0.0.0", config.sync_port)).await?;
    tracing::info!("Event channel listening on port {}", config.sync_port);
    tokio::spawn(run_sync_channel(sync_listener, state.registry.clone()));

    let http_listener = TcpListener::bind(("0.0.0.0", config.http_port)).await?;
    tracing::info!("Mutation API listening on port {}", config.http_port);
    axum::serve(http_listener, router).await?;

    Ok(())
}
