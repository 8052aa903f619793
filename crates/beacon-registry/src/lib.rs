//! # Beacon Registry
//!
//! Server side of the beacon service registry.
//!
//! This crate provides:
//! - The registration directory (authoritative map of live services)
//! - Dependency push and patch fan-out on every directory change
//! - A heartbeat monitor driving add/remove on liveness transitions
//! - The HTTP API (`/register`, `/deregister`) and a standalone server

pub mod api;
pub mod directory;
pub mod heartbeat;
pub mod notify;
pub mod server;

// Re-export commonly used items
pub use directory::{Delivery, Directory, PatchSink, ServiceSummary};
pub use heartbeat::{HeartbeatConfig, HeartbeatMonitor};
pub use notify::{CollectingSink, Notifier};
pub use server::{RegistryConfig, RegistryServer};
