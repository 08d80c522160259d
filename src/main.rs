//! Copresence Relay Server
//!
//! Presence, movement and WebRTC signaling relay for shared 3D scenes.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use copresence_relay::{
    VERSION,
    network::{RelayServer, ServerConfig},
    presence::{POSITION_LIMIT, UPDATE_INTERVAL},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Copresence Relay v{}", VERSION);
    info!("Position limit: ±{} units, update floor: {:?}", POSITION_LIMIT, UPDATE_INTERVAL);

    let config = ServerConfig::from_env()?;
    let server = Arc::new(RelayServer::bind(config).await?);

    let runner = server.clone();
    let mut serve = tokio::spawn(async move { runner.run().await });

    tokio::select! {
        result = &mut serve => {
            result??;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Ctrl-C received, shutting down");
        }
    }

    server.shutdown();
    serve.await??;
    info!("Server stopped");
    Ok(())
}
