//! Registration client - the calls a service makes to join and leave the
//! directory.

use beacon_common::{wire, Registration, Result, DEREGISTER_PATH, REGISTER_PATH, REGISTRY_SERVICE_NAME};
use tracing::info;

/// Typed client for the registry's well-known base URL.
pub struct RegistryClient {
    registry_url: String,
}

impl RegistryClient {
    pub fn new(registry_url: impl Into<String>) -> Self {
        Self {
            registry_url: registry_url.into(),
        }
    }

    pub fn registry_url(&self) -> &str {
        &self.registry_url
    }

    /// Submits a registration. The registry's own identity short-circuits
    /// to Ok - it never registers as a dependency-tracked service.
    pub async fn register(&self, registration: &Registration) -> Result<()> {
        if registration.name.as_str() == REGISTRY_SERVICE_NAME {
            return Ok(());
        }
        info!("registering {} with {}", registration.name, self.registry_url);
        wire::post_json(&self.registry_url, REGISTER_PATH, registration).await
    }

    /// Withdraws a registration, with the same self-identity guard.
    pub async fn deregister(&self, registration: &Registration) -> Result<()> {
        if registration.name.as_str() == REGISTRY_SERVICE_NAME {
            return Ok(());
        }
        info!("deregistering {} from {}", registration.name, self.registry_url);
        wire::post_json(&self.registry_url, DEREGISTER_PATH, registration).await
    }
}
