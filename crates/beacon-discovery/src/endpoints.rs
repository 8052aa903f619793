//! Service-side endpoints for the registry protocol.
//!
//! Every registered service exposes two POST endpoints: the update URL,
//! where the registry delivers patches, and the heartbeat URL, where the
//! monitor probes. The router paths are derived from the URLs in the
//! service's own registration record.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{StatusCode, Uri},
    routing::post,
    Json, Router,
};
use beacon_common::{Error, Patch, Registration};
use tracing::info;

use crate::providers::ProviderCache;

/// Builds the router a service mounts for patch intake and heartbeat
/// probes, applying incoming patches to `cache`.
pub fn create_router(
    cache: ProviderCache,
    registration: &Registration,
) -> Result<Router, Error> {
    let update_path = path_of(&registration.update_url)?;
    let heartbeat_path = path_of(&registration.heartbeat_url)?;
    Ok(Router::new()
        .route(&update_path, post(update_handler))
        .route(&heartbeat_path, post(heartbeat_handler))
        .with_state(cache))
}

fn path_of(url: &str) -> Result<String, Error> {
    let uri: Uri = url.parse().map_err(|_| Error::invalid_url(url))?;
    match uri.path() {
        "" => Ok("/".to_string()),
        // A scheme-less value like "updates" parses as a bare path;
        // axum routes must start with a slash.
        path if path.starts_with('/') => Ok(path.to_string()),
        _ => Err(Error::invalid_url(url)),
    }
}

async fn update_handler(
    State(cache): State<ProviderCache>,
    payload: Result<Json<Patch>, JsonRejection>,
) -> Result<StatusCode, StatusCode> {
    let Json(patch) = payload.map_err(|_| StatusCode::BAD_REQUEST)?;
    info!(
        "received patch: +{} -{}",
        patch.added.len(),
        patch.removed.len()
    );
    cache.apply(&patch).await;
    Ok(StatusCode::OK)
}

async fn heartbeat_handler() -> StatusCode {
    StatusCode::OK
}
