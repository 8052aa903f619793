//! The registration directory - authoritative store of live services.
//!
//! Every mutation and the computation of its notification targets happen
//! under one mutex, so a concurrent reader never observes a mutation whose
//! dependents were computed against different membership. The sends
//! themselves run on independent tasks behind the [`PatchSink`] seam, so a
//! slow or dead peer never blocks directory throughput.

use beacon_common::{Patch, PatchEntry, Registration, ServiceName};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// One patch addressed to one service's update URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub target: String,
    pub patch: Patch,
}

/// Where the directory hands off patch deliveries.
///
/// Dispatch must not block: the directory calls it while holding its lock.
/// The production implementation is [`crate::notify::Notifier`]; tests use
/// [`crate::notify::CollectingSink`].
pub trait PatchSink: Send + Sync {
    fn dispatch(&self, delivery: Delivery);
}

/// Listing entry returned by the `/services` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSummary {
    pub name: ServiceName,
    pub url: String,
    pub registered_at: DateTime<Utc>,
}

#[derive(Clone)]
struct DirectoryEntry {
    registration: Registration,
    registered_at: DateTime<Utc>,
}

/// Cheaply clonable handle to the shared directory state.
#[derive(Clone)]
pub struct Directory {
    services: Arc<Mutex<HashMap<ServiceName, DirectoryEntry>>>,
    sink: Arc<dyn PatchSink>,
    own_name: ServiceName,
}

impl Directory {
    /// Creates an empty directory.
    ///
    /// `own_name` is the registry's own identity; registrations carrying it
    /// are accepted as no-ops so the registry never tracks itself.
    pub fn new(own_name: ServiceName, sink: Arc<dyn PatchSink>) -> Self {
        Self {
            services: Arc::new(Mutex::new(HashMap::new())),
            sink,
            own_name,
        }
    }

    /// Inserts or overwrites a registration, then notifies:
    /// the newcomer gets a patch of its already-registered dependencies
    /// (dependency push), and every other service requiring the newcomer
    /// gets an `added` patch (fan-out).
    pub async fn add(&self, registration: Registration) {
        if registration.name == self.own_name {
            debug!("ignoring self-registration for {}", registration.name);
            return;
        }

        let mut services = self.services.lock().await;
        let name = registration.name.clone();
        info!("registering {} at {}", name, registration.url);

        services.insert(
            name.clone(),
            DirectoryEntry {
                registration: registration.clone(),
                registered_at: Utc::now(),
            },
        );

        // Dependency push: tell the newcomer about its live dependencies.
        let dependencies: Vec<PatchEntry> = registration
            .required
            .iter()
            .filter(|required| **required != name)
            .filter_map(|required| services.get(required))
            .map(|entry| PatchEntry::new(entry.registration.name.clone(), entry.registration.url.clone()))
            .collect();
        if !dependencies.is_empty() {
            self.sink.dispatch(Delivery {
                target: registration.update_url.clone(),
                patch: Patch::added(dependencies),
            });
        }

        // Fan-out: tell every dependent of the newcomer about it.
        let entry = PatchEntry::new(name.clone(), registration.url.clone());
        for other in services.values() {
            if other.registration.name == name {
                continue;
            }
            if other.registration.required.contains(&name) {
                self.sink.dispatch(Delivery {
                    target: other.registration.update_url.clone(),
                    patch: Patch::added(vec![entry.clone()]),
                });
            }
        }
    }

    /// Deletes a registration and fans out a `removed` patch to every
    /// remaining service that required it.
    ///
    /// The address carried in the removal patch is the stored record's URL
    /// when the entry existed; the request body's URL is only a fallback.
    pub async fn remove(&self, registration: &Registration) {
        if registration.name == self.own_name {
            debug!("ignoring self-deregistration for {}", registration.name);
            return;
        }

        let mut services = self.services.lock().await;
        let name = &registration.name;
        let url = match services.remove(name) {
            Some(stored) => stored.registration.url,
            None => registration.url.clone(),
        };
        info!("deregistering {}", name);

        let entry = PatchEntry::new(name.clone(), url);
        for other in services.values() {
            if other.registration.required.contains(name) {
                self.sink.dispatch(Delivery {
                    target: other.registration.update_url.clone(),
                    patch: Patch::removed(vec![entry.clone()]),
                });
            }
        }
    }

    /// Current registration for a name, if any.
    pub async fn get(&self, name: &ServiceName) -> Option<Registration> {
        self.services
            .lock()
            .await
            .get(name)
            .map(|entry| entry.registration.clone())
    }

    /// All current registrations. Used by the heartbeat monitor each cycle.
    pub async fn snapshot(&self) -> Vec<Registration> {
        self.services
            .lock()
            .await
            .values()
            .map(|entry| entry.registration.clone())
            .collect()
    }

    /// Listing for the `/services` endpoint.
    pub async fn summaries(&self) -> Vec<ServiceSummary> {
        self.services
            .lock()
            .await
            .values()
            .map(|entry| ServiceSummary {
                name: entry.registration.name.clone(),
                url: entry.registration.url.clone(),
                registered_at: entry.registered_at,
            })
            .collect()
    }

    /// Number of registered services.
    pub async fn len(&self) -> usize {
        self.services.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.services.lock().await.is_empty()
    }
}
