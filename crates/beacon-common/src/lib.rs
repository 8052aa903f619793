//! # Beacon Common
//!
//! Shared foundation for the beacon service registry: the wire-stable
//! registration and patch types, the error taxonomy, and the JSON-over-HTTP
//! POST helper that every registry-protocol interaction goes through.

pub mod errors;
pub mod types;
pub mod wire;

// Re-export commonly used items
pub use errors::{Error, Result};
pub use types::{Patch, PatchEntry, Registration, ServiceName};
pub use types::{DEREGISTER_PATH, REGISTER_PATH, REGISTRY_SERVICE_NAME};
