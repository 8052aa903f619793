//! Heartbeat monitor - liveness probing with transition-driven notifications.
//!
//! Each cycle probes every watched service concurrently, with a bounded
//! retry budget per service. Directory mutations fire only on state
//! *transitions*: the first failing probe after health removes the service,
//! the first successful probe after failure re-adds it. A service the
//! monitor removed stays on the watch list (state `Removed`) so a later
//! cycle's recovery is still detected.

use crate::directory::Directory;
use beacon_common::{wire, Registration, ServiceName};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Timing knobs for the monitor. All injectable so tests can run cycles at
/// millisecond scale.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Pause between full probe cycles.
    pub cycle_interval: Duration,

    /// Probe attempts per service per cycle.
    pub probe_attempts: u32,

    /// Pause between failed attempts within one cycle.
    pub retry_interval: Duration,

    /// Deadline for a single probe request.
    pub probe_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_secs(60),
            probe_attempts: 3,
            retry_interval: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

impl HeartbeatConfig {
    pub fn with_cycle_interval(mut self, cycle_interval: Duration) -> Self {
        self.cycle_interval = cycle_interval;
        self
    }

    pub fn with_probe_attempts(mut self, probe_attempts: u32) -> Self {
        self.probe_attempts = probe_attempts;
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }
}

/// Per-service probe state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    /// Last probe passed; the service is in the directory.
    Healthy,
    /// Failed within the current cycle; removal has already fired.
    Failing,
    /// Ended a cycle failing; still watched for recovery.
    Removed,
}

/// Directory action a probe result demands, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeAction {
    None,
    /// Remove the service from the directory (fires once per outage).
    Remove,
    /// Re-add the service to the directory (fires once per recovery).
    Restore,
}

impl ProbeState {
    /// Advances the state machine by one probe result.
    pub fn on_probe(self, alive: bool) -> (ProbeState, ProbeAction) {
        match (self, alive) {
            (ProbeState::Healthy, true) => (ProbeState::Healthy, ProbeAction::None),
            (ProbeState::Healthy, false) => (ProbeState::Failing, ProbeAction::Remove),
            (ProbeState::Failing, true) | (ProbeState::Removed, true) => {
                (ProbeState::Healthy, ProbeAction::Restore)
            }
            (ProbeState::Failing, false) => (ProbeState::Failing, ProbeAction::None),
            (ProbeState::Removed, false) => (ProbeState::Removed, ProbeAction::None),
        }
    }

    /// A cycle that ends while failing settles into `Removed`.
    pub fn end_of_cycle(self) -> ProbeState {
        match self {
            ProbeState::Failing => ProbeState::Removed,
            other => other,
        }
    }
}

struct WatchEntry {
    registration: Registration,
    state: ProbeState,
}

/// Background heartbeat loop over a [`Directory`].
pub struct HeartbeatMonitor {
    directory: Directory,
    config: HeartbeatConfig,
    task_handle: Option<JoinHandle<()>>,
}

impl HeartbeatMonitor {
    pub fn new(directory: Directory, config: HeartbeatConfig) -> Self {
        Self {
            directory,
            config,
            task_handle: None,
        }
    }

    /// Starts the background loop. Idempotent: a second call is a warning,
    /// not a second loop.
    pub fn start(&mut self) {
        if self.task_handle.is_some() {
            warn!("heartbeat monitor already started");
            return;
        }

        let directory = self.directory.clone();
        let config = self.config.clone();
        self.task_handle = Some(tokio::spawn(async move {
            run_monitor_loop(directory, config).await;
        }));
        info!(
            "heartbeat monitor started (cycle {:?}, {} attempts, retry {:?})",
            self.config.cycle_interval, self.config.probe_attempts, self.config.retry_interval
        );
    }

    /// Stops the background loop.
    pub fn stop(&mut self) {
        if let Some(task) = self.task_handle.take() {
            task.abort();
            debug!("heartbeat monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_monitor_loop(directory: Directory, config: HeartbeatConfig) {
    let mut watch: HashMap<ServiceName, WatchEntry> = HashMap::new();
    loop {
        sync_watch_list(&mut watch, directory.snapshot().await);
        run_cycle(&directory, &config, &mut watch).await;
        sleep(config.cycle_interval).await;
    }
}

/// Reconciles the watch list with the directory.
///
/// Services present in the directory are watched as `Healthy` (the
/// directory considers them live, including explicit re-registrations of a
/// service the monitor removed). Services absent from the directory leave
/// the list unless the monitor itself removed them, in which case they stay
/// in `Removed` until they recover.
fn sync_watch_list(watch: &mut HashMap<ServiceName, WatchEntry>, snapshot: Vec<Registration>) {
    let mut live: HashSet<ServiceName> = HashSet::with_capacity(snapshot.len());
    for registration in snapshot {
        live.insert(registration.name.clone());
        match watch.entry(registration.name.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.registration = registration;
                entry.state = ProbeState::Healthy;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(WatchEntry {
                    registration,
                    state: ProbeState::Healthy,
                });
            }
        }
    }
    watch.retain(|name, entry| live.contains(name) || entry.state == ProbeState::Removed);
}

/// Probes every watched service concurrently and waits for all sequences to
/// finish - the cycle's only synchronization barrier.
async fn run_cycle(
    directory: &Directory,
    config: &HeartbeatConfig,
    watch: &mut HashMap<ServiceName, WatchEntry>,
) {
    if watch.is_empty() {
        return;
    }
    debug!("heartbeat cycle: probing {} services", watch.len());

    let mut probes = JoinSet::new();
    for entry in watch.values() {
        probes.spawn(probe_sequence(
            directory.clone(),
            entry.registration.clone(),
            entry.state,
            config.clone(),
        ));
    }
    while let Some(joined) = probes.join_next().await {
        match joined {
            Ok((name, state)) => {
                if let Some(entry) = watch.get_mut(&name) {
                    entry.state = state.end_of_cycle();
                }
            }
            Err(e) => warn!("heartbeat probe task failed: {}", e),
        }
    }
}

/// One service's probe attempts for one cycle. Stops early on the first
/// success; otherwise burns the full retry budget, removing the service on
/// the transition into failure.
async fn probe_sequence(
    directory: Directory,
    registration: Registration,
    mut state: ProbeState,
    config: HeartbeatConfig,
) -> (ServiceName, ProbeState) {
    for attempt in 1..=config.probe_attempts {
        let alive = wire::probe(&registration.heartbeat_url, config.probe_timeout)
            .await
            .is_ok();
        let (next, action) = state.on_probe(alive);
        state = next;

        match action {
            ProbeAction::Remove => {
                warn!(
                    "🚨 heartbeat failed for {} (attempt {}/{}), removing from directory",
                    registration.name, attempt, config.probe_attempts
                );
                directory.remove(&registration).await;
            }
            ProbeAction::Restore => {
                info!("✅ {} recovered, re-adding to directory", registration.name);
                directory.add(registration.clone()).await;
            }
            ProbeAction::None => {
                debug!(
                    "heartbeat {} for {} (attempt {}/{})",
                    if alive { "passed" } else { "failed" },
                    registration.name,
                    attempt,
                    config.probe_attempts
                );
            }
        }

        if alive {
            break;
        }
        if attempt < config.probe_attempts {
            sleep(config.retry_interval).await;
        }
    }
    (registration.name, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::CollectingSink;
    use beacon_common::REGISTRY_SERVICE_NAME;
    use std::sync::Arc;

    /// Folds a probe-result sequence through the state machine, counting
    /// the directory actions it would fire.
    fn run_probes(mut state: ProbeState, results: &[bool]) -> (ProbeState, u32, u32) {
        let (mut removes, mut restores) = (0, 0);
        for &alive in results {
            let (next, action) = state.on_probe(alive);
            state = next;
            match action {
                ProbeAction::Remove => removes += 1,
                ProbeAction::Restore => restores += 1,
                ProbeAction::None => {}
            }
        }
        (state, removes, restores)
    }

    #[test]
    fn test_healthy_service_stays_quiet() {
        let (state, removes, restores) = run_probes(ProbeState::Healthy, &[true, true, true]);
        assert_eq!(state, ProbeState::Healthy);
        assert_eq!((removes, restores), (0, 0));
    }

    #[test]
    fn test_full_failure_removes_exactly_once() {
        let (state, removes, restores) = run_probes(ProbeState::Healthy, &[false, false, false]);
        assert_eq!(state, ProbeState::Failing);
        assert_eq!((removes, restores), (1, 0));
        assert_eq!(state.end_of_cycle(), ProbeState::Removed);
    }

    #[test]
    fn test_recovery_within_cycle_restores_once() {
        let (state, removes, restores) = run_probes(ProbeState::Healthy, &[false, false, true]);
        assert_eq!(state, ProbeState::Healthy);
        assert_eq!((removes, restores), (1, 1));
    }

    #[test]
    fn test_recovery_in_later_cycle_restores_once() {
        // Cycle N: all probes fail, cycle ends in Removed.
        let (state, removes, _) = run_probes(ProbeState::Healthy, &[false, false, false]);
        let state = state.end_of_cycle();
        assert_eq!(removes, 1);

        // Cycle N+1: still down, no further notifications.
        let (state, removes, restores) = run_probes(state, &[false, false, false]);
        assert_eq!((removes, restores), (0, 0));
        let state = state.end_of_cycle();

        // Cycle N+2: first successful probe re-adds exactly once.
        let (state, removes, restores) = run_probes(state, &[true]);
        assert_eq!(state, ProbeState::Healthy);
        assert_eq!((removes, restores), (0, 1));
    }

    fn registration(name: &str) -> Registration {
        Registration::new(name, format!("http://h/{}", name))
    }

    fn test_directory() -> Directory {
        Directory::new(
            ServiceName::from(REGISTRY_SERVICE_NAME),
            Arc::new(CollectingSink::new()),
        )
    }

    #[tokio::test]
    async fn test_sync_watch_list_adds_and_drops() {
        let mut watch = HashMap::new();
        sync_watch_list(&mut watch, vec![registration("a"), registration("b")]);
        assert_eq!(watch.len(), 2);
        assert_eq!(watch[&ServiceName::from("a")].state, ProbeState::Healthy);

        // b deregistered explicitly: it leaves the watch list.
        sync_watch_list(&mut watch, vec![registration("a")]);
        assert_eq!(watch.len(), 1);
        assert!(watch.contains_key(&ServiceName::from("a")));
    }

    #[tokio::test]
    async fn test_sync_watch_list_keeps_removed_services() {
        let mut watch = HashMap::new();
        sync_watch_list(&mut watch, vec![registration("a")]);
        watch.get_mut(&ServiceName::from("a")).unwrap().state = ProbeState::Removed;

        // Gone from the directory because the monitor removed it: stays watched.
        sync_watch_list(&mut watch, vec![]);
        assert_eq!(watch[&ServiceName::from("a")].state, ProbeState::Removed);

        // Explicit re-registration makes it healthy again.
        sync_watch_list(&mut watch, vec![registration("a")]);
        assert_eq!(watch[&ServiceName::from("a")].state, ProbeState::Healthy);
    }

    #[tokio::test]
    async fn test_monitor_start_is_idempotent() {
        let mut monitor = HeartbeatMonitor::new(test_directory(), HeartbeatConfig::default());
        assert!(!monitor.is_running());

        monitor.start();
        assert!(monitor.is_running());
        // A second start is a warning, not a second loop.
        monitor.start();
        assert!(monitor.is_running());

        monitor.stop();
        assert!(!monitor.is_running());
    }
}
