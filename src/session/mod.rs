// SPDX-License-Identifier: MIT
//! Observer session lifecycle.
//!
//! A [`NetworkSession`] binds one consumer (a screen, a widget, a service) to
//! the reconciliation engine. Starting it registers with the platform signal
//! source and spawns the session's reconciler; stopping it unsubscribes and
//! cancels any in-flight probe. Subscription and probe are acquired together
//! and released together on every exit path, including drop.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::MonitorConfig;
use crate::engine;
use crate::events::{ChangeNotifier, NetworkChanged};
use crate::probe::Prober;
use crate::signal::{
    Capabilities, LinkQuery, PushRegistration, SignalSource, SourceTier, Subscription,
};
use crate::state::SharedProcessState;

struct Running {
    task: JoinHandle<()>,
    subscription: Subscription,
}

/// One lifecycle-scoped consumer of connectivity state.
///
/// Holds its own [`NetworkState`](crate::state::NetworkState) copy (inside
/// the reconciler task) plus a read handle on the process-wide register for
/// non-blocking "last known" answers.
pub struct NetworkSession {
    config: Arc<MonitorConfig>,
    process: SharedProcessState,
    prober: Arc<dyn Prober>,
    /// Platform link query. `None` after a terminal stop — the session is
    /// finished and can no longer observe anything.
    query: Option<Arc<dyn LinkQuery>>,
    notifier: ChangeNotifier,
    source: SignalSource,
    events_enabled: bool,
    running: Option<Running>,
}

impl NetworkSession {
    pub(crate) fn new(
        config: Arc<MonitorConfig>,
        process: SharedProcessState,
        prober: Arc<dyn Prober>,
        query: Arc<dyn LinkQuery>,
        capabilities: Capabilities,
    ) -> Self {
        let tier = SourceTier::select(capabilities);
        let events_enabled = config.signals.enabled;
        let source = SignalSource::new(tier, config.signals.poll_interval());
        Self {
            config,
            process,
            prober,
            query: Some(query),
            notifier: ChangeNotifier::new(),
            source,
            events_enabled,
            running: None,
        }
    }

    /// The signal-source tier this session was bound to.
    pub fn tier(&self) -> SourceTier {
        self.source.tier()
    }

    /// Permanently opt this session out of all signal processing. After this,
    /// [`start`](Self::start) and [`stop`](Self::stop) are no-ops.
    pub fn disable_events(&mut self) {
        if self.running.is_some() {
            self.teardown();
        }
        self.events_enabled = false;
    }

    /// Begin observing: spawn the reconciler (seeded with the process
    /// register's last known transport, never its activity) and register with
    /// the signal source, which synthesizes the initial signal for tiers that
    /// need it. Idempotent while running; a no-op when events are disabled or
    /// after a terminal stop.
    pub fn start(&mut self) {
        if !self.events_enabled || self.running.is_some() {
            return;
        }
        let Some(query) = self.query.clone() else {
            debug!("start ignored: session already terminally stopped");
            return;
        };

        let warm_transport = self.process.snapshot().transport;
        let (handle, task) = engine::spawn(
            Arc::clone(&self.config),
            Arc::clone(&self.process),
            Arc::clone(&self.prober),
            self.notifier.clone(),
            warm_transport,
        );
        let subscription = self.source.subscribe(query, Arc::new(handle));
        info!(tier = ?self.source.tier(), %warm_transport, "session started");
        self.running = Some(Running { task, subscription });
    }

    /// Stop observing. Always unsubscribes and cancels any in-flight probe;
    /// a `terminal` stop additionally releases the platform query so the
    /// session can never be started again (drop behaves the same way).
    pub fn stop(&mut self, terminal: bool) {
        if !self.events_enabled {
            return;
        }
        self.teardown();
        if terminal {
            self.query = None;
        }
    }

    fn teardown(&mut self) {
        if let Some(running) = self.running.take() {
            // Aborting the reconciler drops its ProbeHandle, which cancels
            // the in-flight probe and its timeout timer. The subscription
            // drop releases the poll task.
            running.task.abort();
            drop(running.subscription);
            info!("session stopped");
        }
    }

    /// Receive [`NetworkChanged`] notifications from this session.
    pub fn subscribe(&self) -> broadcast::Receiver<NetworkChanged> {
        self.notifier.subscribe()
    }

    /// Last known process-wide answer, without waiting for a probe.
    pub fn is_active_internet(&self) -> bool {
        self.process.is_active_internet()
    }

    /// Hand-off point for platform push callbacks. `None` on the poll tier or
    /// when the session is not running.
    pub fn push_registration(&self) -> Option<PushRegistration> {
        self.running
            .as_ref()
            .and_then(|r| r.subscription.registration())
    }
}

impl Drop for NetworkSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
