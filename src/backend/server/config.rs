/**
 * Server Configuration
 *
 * Configuration is loaded from environment variables with defaults
 * suited to local development. A missing or unreachable database does
 * not prevent startup: the server degrades to the in-memory store and
 * keeps running.
 */

use std::sync::Arc;

use crate::backend::store::{MemoryStore, PgStore, Store};

/// Runtime configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP mutation-API port (`SERVER_PORT`, default 3000)
    pub http_port: u16,
    /// Event fan-out channel port (`SYNC_PORT`, default 1234)
    pub sync_port: u16,
    /// PostgreSQL connection string (`DATABASE_URL`, optional)
    pub database_url: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            http_port: port_from_env("SERVER_PORT", 3000),
            sync_port: port_from_env("SYNC_PORT", 1234),
            database_url: std::env::var("DATABASE_URL").ok(),
        }
    }
}

fn port_from_env(var: &str, default: u16) -> u16 {
    match std::env::var(var) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("{} is not a valid port ({}), using {}", var, raw, default);
            default
        }),
        Err(_) => default,
    }
}

/// Build the document store the configuration asks for.
///
/// Falls back to `MemoryStore` when `DATABASE_URL` is unset or the
/// connection fails; the error is logged and the server continues
/// without persistence.
pub async fn load_store(config: &ServerConfig) -> Arc<dyn Store> {
    let Some(url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, using in-memory store");
        return Arc::new(MemoryStore::new());
    };

    tracing::info!("Connecting to database...");
    match PgStore::connect(url).await {
        Ok(store) => {
            tracing::info!("Database connection pool created");
            Arc::new(store)
        }
        Err(e) => {
            tracing::error!("Failed to connect to database: {:?}", e);
            tracing::warn!("Falling back to in-memory store");
            Arc::new(MemoryStore::new())
        }
    }
}
