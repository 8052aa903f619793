//! Wire types for the registry protocol.
//!
//! Field names on the wire are stable: a registration serializes with
//! `name`, `url`, `required`, `updateurl`, `heartbeat`, and a patch with
//! `added`/`removed` entry lists of `name`/`url` pairs. The serde rename
//! attributes pin that contract regardless of the Rust-side field names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity the registry reserves for itself. Registration requests carrying
/// this name are accepted as no-ops so the registry never tracks itself.
pub const REGISTRY_SERVICE_NAME: &str = "beacon-registry";

/// Path the registry accepts registrations on.
pub const REGISTER_PATH: &str = "/register";

/// Path the registry accepts deregistrations on.
pub const DEREGISTER_PATH: &str = "/deregister";

/// Service name - uniquely identifies one service in the deployment.
///
/// The directory tracks at most one live instance per name; re-registration
/// under the same name overwrites the previous record.
///
/// # Example
/// ```
/// use beacon_common::ServiceName;
///
/// let name = ServiceName::from("grading");
/// assert_eq!(name.as_str(), "grading");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceName(String);

impl ServiceName {
    /// Creates a new ServiceName from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the service name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServiceName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ServiceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The record a service submits to join the directory.
///
/// `update_url` is where the registry POSTs patches for this service;
/// `heartbeat_url` is where the monitor probes for liveness. `required`
/// lists the names of services this instance depends on - order is
/// irrelevant and duplicates carry no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub name: ServiceName,

    /// Base address at which the service is reachable.
    pub url: String,

    #[serde(default)]
    pub required: Vec<ServiceName>,

    /// Address the registry delivers patches to.
    #[serde(rename = "updateurl", default)]
    pub update_url: String,

    /// Address the heartbeat monitor probes.
    #[serde(rename = "heartbeat", default)]
    pub heartbeat_url: String,
}

impl Registration {
    /// Creates a registration with the conventional callback paths
    /// (`<url>/updates` and `<url>/heartbeat`) and no dependencies.
    pub fn new(name: impl Into<ServiceName>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            name: name.into(),
            update_url: format!("{}/updates", url),
            heartbeat_url: format!("{}/heartbeat", url),
            url,
            required: Vec::new(),
        }
    }

    /// Sets the list of required service names.
    pub fn with_required(mut self, required: Vec<ServiceName>) -> Self {
        self.required = required;
        self
    }

    /// Overrides the patch-delivery address.
    pub fn with_update_url(mut self, update_url: impl Into<String>) -> Self {
        self.update_url = update_url.into();
        self
    }

    /// Overrides the heartbeat probe address.
    pub fn with_heartbeat_url(mut self, heartbeat_url: impl Into<String>) -> Self {
        self.heartbeat_url = heartbeat_url.into();
        self
    }
}

/// One service's address, as carried in a patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchEntry {
    pub name: ServiceName,
    pub url: String,
}

impl PatchEntry {
    pub fn new(name: impl Into<ServiceName>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// A directory change: addresses that became available and addresses that
/// went away. Patches are commutative set-edits, not a log - consumers must
/// tolerate out-of-order delivery. A single patch sent to one recipient
/// never lists the same entry on both sides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    #[serde(default)]
    pub added: Vec<PatchEntry>,
    #[serde(default)]
    pub removed: Vec<PatchEntry>,
}

impl Patch {
    /// A patch that only adds entries.
    pub fn added(entries: Vec<PatchEntry>) -> Self {
        Self {
            added: entries,
            removed: Vec::new(),
        }
    }

    /// A patch that only removes entries.
    pub fn removed(entries: Vec<PatchEntry>) -> Self {
        Self {
            added: Vec::new(),
            removed: entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
