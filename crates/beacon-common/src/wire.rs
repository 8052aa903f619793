//! JSON-over-HTTP POST transport.
//!
//! One helper covers every registry-protocol interaction: registration,
//! deregistration, patch delivery, and heartbeat probes. Anything other
//! than a 200 response is classified as a failure carrying the URL and
//! status, so all callers share a single failure-classification path.

use crate::errors::{Error, Result};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::Serialize;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Serializes `body` to JSON and POSTs it to `base_url + path`.
pub async fn post_json<T: Serialize>(base_url: &str, path: &str, body: &T) -> Result<()> {
    post_json_with_timeout(base_url, path, body, DEFAULT_TIMEOUT).await
}

/// Same as [`post_json`], with a caller-supplied deadline.
pub async fn post_json_with_timeout<T: Serialize>(
    base_url: &str,
    path: &str,
    body: &T,
    deadline: Duration,
) -> Result<()> {
    let url = format!("{}{}", base_url, path);
    let uri: Uri = url.parse().map_err(|_| Error::invalid_url(&url))?;
    let payload = serde_json::to_vec(body)?;

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(hyper::header::CONTENT_TYPE, "application/json")
        .header(hyper::header::USER_AGENT, "beacon/0.1")
        .body(Full::new(Bytes::from(payload)))
        .map_err(|e| Error::connection(&url, e.to_string()))?;

    let client = Client::builder(TokioExecutor::new()).build_http();

    let response = match timeout(deadline, client.request(request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => return Err(Error::connection(&url, e.to_string())),
        Err(_) => return Err(Error::connection(&url, "timeout")),
    };

    debug!("POST {} -> {}", url, response.status());

    if response.status() != StatusCode::OK {
        return Err(Error::bad_status(&url, response.status().as_u16()));
    }
    Ok(())
}

/// Probes a heartbeat endpoint: a POST with a minimal body, 200 means alive.
pub async fn probe(heartbeat_url: &str, deadline: Duration) -> Result<()> {
    post_json_with_timeout(heartbeat_url, "", &serde_json::json!({}), deadline).await
}
