/**
 * listsync Server Binary
 *
 * Loads environment configuration, initializes logging, and starts
 * the mutation API and the event fan-out channel.
 */

use listsync::backend::server::config::ServerConfig;
use listsync::backend::server::init::serve;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env();
    tracing::info!(
        "Starting listsync (http port {}, sync port {})",
        config.http_port,
        config.sync_port
    );

    serve(config).await
}
