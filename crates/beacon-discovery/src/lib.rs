//! # Beacon Discovery
//!
//! Client side of the beacon service registry.
//!
//! A service keeps a [`ProviderCache`] - its best-effort local view of
//! reachable addresses per service name - updated by patches the registry
//! POSTs to the service's update URL. [`endpoints::create_router`] builds
//! the axum router a service mounts for patch intake and heartbeat probes,
//! and [`RegistryClient`] performs the registration calls.

pub mod client;
pub mod endpoints;
pub mod providers;

// Re-export commonly used items
pub use client::RegistryClient;
pub use providers::ProviderCache;
