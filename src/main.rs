//! duetd - random 1:1 pairing and WebRTC signaling server.

use duetd::config::Config;
use duetd::coordinator::Event;
use duetd::server;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "duetd.toml".to_string());

    let config = if Path::new(&config_path).exists() {
        Config::load(&config_path).map_err(|e| {
            error!(path = %config_path, error = %e, "Failed to load config");
            e
        })?
    } else {
        info!(path = %config_path, "No config file found, using defaults");
        Config::default()
    };

    info!(
        server = %config.server.name,
        listen = %config.listen.address,
        "Starting duetd"
    );

    let running = server::start(config).await?;

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");

    // Farewell goes out through the normal outbound queues; give the
    // connection tasks a moment to flush before the process exits.
    let _ = running.events.send(Event::Shutdown {
        message: "Server is shutting down. Thanks for stopping by!".to_string(),
    });
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;

    Ok(())
}
