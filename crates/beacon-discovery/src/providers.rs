//! The provider cache - a service's local view of who is reachable where.
//!
//! Patches are commutative set-edits applied under an exclusive write lock;
//! resolution takes a shared read lock, so lookups run concurrently.
//! Addresses are deliberately not deduplicated: several instances can sit
//! behind one name, and a duplicate `added` entry is harmless because
//! removal deletes one matching address at a time.

use beacon_common::{Error, Patch, Result, ServiceName};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Cheaply clonable handle to the shared cache state.
#[derive(Clone, Default)]
pub struct ProviderCache {
    services: Arc<RwLock<HashMap<ServiceName, Vec<String>>>>,
}

impl ProviderCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a patch: appends every `added` address, deletes the first
    /// matching address per `removed` entry (a miss is a no-op), and drops
    /// a service's entry once its address list is empty.
    pub async fn apply(&self, patch: &Patch) {
        let mut services = self.services.write().await;
        for entry in &patch.added {
            services
                .entry(entry.name.clone())
                .or_default()
                .push(entry.url.clone());
        }
        for entry in &patch.removed {
            let Some(addresses) = services.get_mut(&entry.name) else {
                continue;
            };
            if let Some(index) = addresses.iter().position(|url| url == &entry.url) {
                addresses.remove(index);
            }
            if addresses.is_empty() {
                services.remove(&entry.name);
            }
        }
        debug!(
            "applied patch: +{} -{}, {} services known",
            patch.added.len(),
            patch.removed.len(),
            services.len()
        );
    }

    /// Picks one address for `name` uniformly at random among the known
    /// candidates.
    pub async fn resolve(&self, name: &ServiceName) -> Result<String> {
        let services = self.services.read().await;
        let addresses = services
            .get(name)
            .filter(|addresses| !addresses.is_empty())
            .ok_or_else(|| Error::provider_not_found(name.clone()))?;
        let index = rand::thread_rng().gen_range(0..addresses.len());
        Ok(addresses[index].clone())
    }

    /// All known addresses for a name, in arrival order.
    pub async fn providers_of(&self, name: &ServiceName) -> Vec<String> {
        self.services
            .read()
            .await
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of service names with at least one known address.
    pub async fn len(&self) -> usize {
        self.services.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.services.read().await.is_empty()
    }
}
