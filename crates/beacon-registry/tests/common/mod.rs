//! Shared helpers for the end-to-end tests: fake peer services with a
//! patch-capturing update endpoint and a switchable heartbeat endpoint.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use beacon_common::Patch;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Clone)]
struct PeerState {
    patches: mpsc::UnboundedSender<Patch>,
    alive: Arc<AtomicBool>,
}

/// A fake registered service listening on an ephemeral port.
pub struct Peer {
    pub base_url: String,
    pub patches: mpsc::UnboundedReceiver<Patch>,
    alive: Arc<AtomicBool>,
}

impl Peer {
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }
}

async fn update_endpoint(State(state): State<PeerState>, Json(patch): Json<Patch>) -> StatusCode {
    let _ = state.patches.send(patch);
    StatusCode::OK
}

async fn heartbeat_endpoint(State(state): State<PeerState>) -> StatusCode {
    if state.alive.load(Ordering::SeqCst) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub async fn spawn_peer() -> Peer {
    let (tx, rx) = mpsc::unbounded_channel();
    let alive = Arc::new(AtomicBool::new(true));

    let app = Router::new()
        .route("/updates", post(update_endpoint))
        .route("/heartbeat", post(heartbeat_endpoint))
        .with_state(PeerState {
            patches: tx,
            alive: Arc::clone(&alive),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Peer {
        base_url: format!("http://{}", addr),
        patches: rx,
        alive,
    }
}

/// Waits up to 3 seconds for the next patch delivered to a peer.
pub async fn recv_patch(rx: &mut mpsc::UnboundedReceiver<Patch>) -> Patch {
    tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("timed out waiting for a patch")
        .expect("patch channel closed")
}

/// Asserts that no patch arrives within the given window.
pub async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<Patch>, window: Duration) {
    if let Ok(Some(patch)) = tokio::time::timeout(window, rx.recv()).await {
        panic!("unexpected patch delivery: {:?}", patch);
    }
}
