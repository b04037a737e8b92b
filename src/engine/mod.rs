// SPDX-License-Identifier: MIT
//! Network-state reconciliation engine.
//!
//! One reconciler task runs per observing session. It is the single reader
//! and writer of the session's [`NetworkState`] copy: passive signals and
//! probe completions are both funneled through channels into one
//! `tokio::select!` loop, so reconciliation is strictly sequential no matter
//! how concurrently the sources fire.
//!
//! # State machine
//!
//! ```text
//!              linkUp(t) ──► Connecting ──probe ok──► Active
//!                 │              ▲    └──probe err──► Inactive
//!   Unknown ──────┤              │ (any linkUp re-enters)
//!                 └─ linkDown ──► down, notified immediately, no probe
//! ```
//!
//! At most one probe is in flight; starting a new one cancels the previous
//! one first, and a generation counter makes any late completion of a
//! superseded probe a no-op.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::MonitorConfig;
use crate::events::ChangeNotifier;
use crate::probe::{spawn_probe, ProbeHandle, ProbeOutcome, Prober};
use crate::signal::{LinkSignal, SignalSink};
use crate::state::{merge_probe_result, NetworkState, SharedProcessState, TransportKind};

const SIGNAL_QUEUE_DEPTH: usize = 64;
const OUTCOME_QUEUE_DEPTH: usize = 8;

/// Cheap handle used to feed signals into a running reconciler.
///
/// Implements [`SignalSink`] so any source tier can deliver into it. Delivery
/// never blocks; signals for a stopped session are dropped silently.
#[derive(Clone)]
pub struct EngineHandle {
    signals: mpsc::Sender<LinkSignal>,
}

impl SignalSink for EngineHandle {
    fn deliver(&self, signal: LinkSignal) {
        if self.signals.try_send(signal).is_err() {
            debug!(?signal, "signal dropped: session stopped or backlogged");
        }
    }
}

/// Spawn a reconciler for one session.
///
/// `warm_transport` seeds the session copy with the process register's last
/// known transport kind — activity is never inherited, only re-proven.
pub fn spawn(
    config: Arc<MonitorConfig>,
    process: SharedProcessState,
    prober: Arc<dyn Prober>,
    notifier: ChangeNotifier,
    warm_transport: TransportKind,
) -> (EngineHandle, JoinHandle<()>) {
    let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_QUEUE_DEPTH);
    let (outcome_tx, outcome_rx) = mpsc::channel(OUTCOME_QUEUE_DEPTH);

    let reconciler = Reconciler {
        session: NetworkState {
            transport: warm_transport,
            ..NetworkState::default()
        },
        probe: None,
        generation: 0,
        config,
        process,
        prober,
        notifier,
        outcome_tx,
    };
    let task = tokio::spawn(reconciler.run(signal_rx, outcome_rx));
    (EngineHandle { signals: signal_tx }, task)
}

struct Reconciler {
    session: NetworkState,
    /// In-flight probe, if any. Dropping the handle cancels it, so aborting
    /// the reconciler task can never leak a timer or a pending callback.
    probe: Option<ProbeHandle>,
    generation: u64,
    config: Arc<MonitorConfig>,
    process: SharedProcessState,
    prober: Arc<dyn Prober>,
    notifier: ChangeNotifier,
    outcome_tx: mpsc::Sender<ProbeOutcome>,
}

impl Reconciler {
    async fn run(
        mut self,
        mut signals: mpsc::Receiver<LinkSignal>,
        mut outcomes: mpsc::Receiver<ProbeOutcome>,
    ) {
        loop {
            tokio::select! {
                maybe = signals.recv() => match maybe {
                    Some(signal) => self.on_signal(signal),
                    // Session handle dropped — tear down.
                    None => break,
                },
                Some(outcome) = outcomes.recv() => self.on_probe_done(outcome),
            }
        }
    }

    fn on_signal(&mut self, signal: LinkSignal) {
        debug!(?signal, state = ?self.session, "reconciling signal");
        match signal {
            LinkSignal::Available(transport) => self.link_up(transport),
            LinkSignal::Lost | LinkSignal::Unavailable => self.link_down(),
        }
    }

    /// Link went away: immediate downgrade, no probe, notify every time.
    fn link_down(&mut self) {
        self.cancel_probe();
        self.session = NetworkState::default();
        self.publish();
    }

    fn link_up(&mut self, transport: TransportKind) {
        if self.session.is_active && self.session.transport == transport {
            // Already verified on this transport — duplicate signal, no probe,
            // no notification.
            debug!(%transport, "link signal is a no-op");
            return;
        }

        self.cancel_probe();
        self.session.is_connected = true;
        self.session.transport = transport;

        // Cross-session convergence: if another session's probe already
        // verified this same transport, promote without a redundant probe.
        let known = self.process.snapshot();
        if !self.session.is_active && known.is_active && known.transport == transport {
            info!(%transport, "promoting from process-wide state");
            self.session.is_active = true;
            self.publish();
            return;
        }

        // Transport changed while active: stay connected, keep the stale
        // activity flag until the probe resolves.
        self.start_probe();
    }

    fn on_probe_done(&mut self, outcome: ProbeOutcome) {
        // A completion from a superseded or cancelled probe must not touch
        // state — only the generation we are currently waiting on counts.
        let live = self
            .probe
            .as_ref()
            .is_some_and(|p| p.generation() == outcome.generation);
        if !live {
            debug!(generation = outcome.generation, "discarding stale probe outcome");
            return;
        }
        self.probe = None;
        merge_probe_result(&mut self.session, &self.process, outcome.success);
        info!(
            active = self.session.is_active,
            transport = %self.session.transport,
            "probe settled"
        );
        self.notifier
            .notify(self.session.is_active, self.session.transport);
    }

    fn start_probe(&mut self) {
        self.generation += 1;
        debug!(generation = self.generation, url = %self.config.probe.url, "starting probe");
        self.probe = Some(spawn_probe(
            Arc::clone(&self.prober),
            self.config.probe.url.clone(),
            self.config.probe.timeout(),
            self.generation,
            self.outcome_tx.clone(),
        ));
    }

    fn cancel_probe(&mut self) {
        if let Some(probe) = self.probe.take() {
            debug!(generation = probe.generation(), "cancelling in-flight probe");
            probe.cancel();
        }
    }

    /// Mirror the session copy into the process register and notify.
    fn publish(&mut self) {
        self.process.store(self.session);
        self.notifier
            .notify(self.session.is_active, self.session.transport);
    }
}
