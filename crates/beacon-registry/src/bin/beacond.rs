//! Standalone registry server.
//!
//! Usage:
//!   beacond            # default port 3000
//!   beacond <port>     # explicit port

use beacon_registry::{RegistryConfig, RegistryServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = parse_args();

    tracing::info!("beacon registry starting on port {}", config.port);
    tracing::info!("press Ctrl+C to stop");

    RegistryServer::new(config).run().await
}

fn parse_args() -> RegistryConfig {
    let mut config = RegistryConfig::default();
    if let Some(arg) = std::env::args().nth(1) {
        match arg.parse() {
            Ok(port) => config.port = port,
            Err(_) => {
                eprintln!("invalid port: {}", arg);
                eprintln!("usage: beacond [port]");
                std::process::exit(1);
            }
        }
    }
    config
}
