//! Error types for the beacon registry.
//!
//! Transport failures (connection refused, timeout, non-200 status) are
//! liveness evidence for the heartbeat monitor and best-effort losses for
//! patch fan-out; they never carry enough weight to be fatal. Lookup misses
//! get their own variant so callers can decide their retry policy.

use crate::types::ServiceName;
use thiserror::Error;

/// Result type alias for beacon operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for registry-protocol operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A POST reached the peer but came back with a non-200 status.
    #[error("request to {url} returned status {status}")]
    BadStatus { url: String, status: u16 },

    /// A POST never completed (connection refused, reset, timeout).
    #[error("request to {url} failed: {reason}")]
    Connection { url: String, reason: String },

    /// A URL could not be parsed.
    #[error("invalid url: {url}")]
    InvalidUrl { url: String },

    /// No known address for a service name.
    #[error("no known provider for service: {name}")]
    ProviderNotFound { name: ServiceName },

    /// JSON encode/decode failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (wraps std::io::Error).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a BadStatus error.
    pub fn bad_status(url: impl Into<String>, status: u16) -> Self {
        Self::BadStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a Connection error.
    pub fn connection(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connection {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an InvalidUrl error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a ProviderNotFound error.
    pub fn provider_not_found(name: ServiceName) -> Self {
        Self::ProviderNotFound { name }
    }
}
