//! Registry server assembly: directory + notifier + heartbeat monitor +
//! HTTP listener.

use crate::api::create_router;
use crate::directory::Directory;
use crate::heartbeat::{HeartbeatConfig, HeartbeatMonitor};
use crate::notify::Notifier;
use beacon_common::{ServiceName, REGISTRY_SERVICE_NAME};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub port: u16,

    /// The registry's own identity, used by the self-registration guard.
    pub service_name: ServiceName,

    /// Capacity of the patch-delivery queue.
    pub notify_queue_capacity: usize,

    pub heartbeat: HeartbeatConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            service_name: ServiceName::from(REGISTRY_SERVICE_NAME),
            notify_queue_capacity: 256,
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

impl RegistryConfig {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.heartbeat = heartbeat;
        self
    }
}

/// The registry server.
pub struct RegistryServer {
    directory: Directory,
    monitor: HeartbeatMonitor,
    port: u16,
}

impl RegistryServer {
    /// Wires up the directory, delivery worker, and heartbeat monitor.
    /// Must be called from within a tokio runtime.
    pub fn new(config: RegistryConfig) -> Self {
        let notifier = Notifier::spawn(config.notify_queue_capacity);
        let directory = Directory::new(config.service_name, Arc::new(notifier));
        let monitor = HeartbeatMonitor::new(directory.clone(), config.heartbeat);
        Self {
            directory,
            monitor,
            port: config.port,
        }
    }

    /// Returns a handle to the directory.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Starts the heartbeat monitor and serves until the listener fails.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.monitor.start();

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr).await?;
        info!("registry listening on {}", addr);

        axum::serve(listener, create_router(self.directory.clone())).await?;
        Ok(())
    }
}
