//! Patch delivery workers.
//!
//! The directory never talks to the network directly: it dispatches
//! [`Delivery`] values into a bounded queue drained by a small pool of
//! worker tasks, so one dead peer waiting out its request timeout does not
//! hold up deliveries to everyone else. Delivery is fire-and-forget -
//! failures are logged and counted, never retried (heartbeat re-detection
//! is the recovery path). A full queue drops the delivery rather than
//! block the directory lock.

use crate::directory::{Delivery, PatchSink};
use beacon_common::wire;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

/// Number of concurrent delivery workers.
const DELIVERY_WORKERS: usize = 4;

/// Delivery counters, readable while the workers run.
#[derive(Debug, Default)]
struct NotifierStats {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Queue-backed [`PatchSink`] drained by a pool of delivery tasks.
#[derive(Clone)]
pub struct Notifier {
    queue: mpsc::Sender<Delivery>,
    stats: Arc<NotifierStats>,
}

impl Notifier {
    /// Spawns the delivery workers and returns the sending handle.
    ///
    /// `capacity` bounds the deliveries queued beyond the ones in flight.
    /// The workers exit once every handle is dropped and the queue drains.
    /// Must be called from within a tokio runtime.
    pub fn spawn(capacity: usize) -> Self {
        let (queue, receiver) = mpsc::channel::<Delivery>(capacity);
        let stats = Arc::new(NotifierStats::default());
        let receiver = Arc::new(AsyncMutex::new(receiver));

        for _ in 0..DELIVERY_WORKERS {
            let receiver = Arc::clone(&receiver);
            let worker_stats = Arc::clone(&stats);
            tokio::spawn(async move {
                loop {
                    // The lock is held only while idle on recv, never
                    // across the POST, so workers deliver concurrently.
                    let delivery = receiver.lock().await.recv().await;
                    let Some(delivery) = delivery else { break };
                    match wire::post_json(&delivery.target, "", &delivery.patch).await {
                        Ok(()) => {
                            debug!("delivered patch to {}", delivery.target);
                            worker_stats.delivered.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            warn!("failed to deliver patch to {}: {}", delivery.target, e);
                            worker_stats.failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                debug!("delivery worker exiting");
            });
        }

        Self { queue, stats }
    }

    pub fn delivered(&self) -> u64 {
        self.stats.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.stats.failed.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.stats.dropped.load(Ordering::Relaxed)
    }
}

impl PatchSink for Notifier {
    fn dispatch(&self, delivery: Delivery) {
        if self.queue.try_send(delivery).is_err() {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("notification queue full, dropping a patch delivery");
        }
    }
}

/// Test double recording every dispatched delivery.
#[derive(Clone, Default)]
pub struct CollectingSink {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains and returns everything dispatched so far.
    pub fn take(&self) -> Vec<Delivery> {
        std::mem::take(&mut *self.deliveries.lock().unwrap())
    }
}

impl PatchSink for CollectingSink {
    fn dispatch(&self, delivery: Delivery) {
        self.deliveries.lock().unwrap().push(delivery);
    }
}
