// SPDX-License-Identifier: MIT
//! Passive connectivity signal sources.
//!
//! Platforms differ in how they announce connectivity transitions: a unified
//! push callback for the best current network, a push callback filtered by
//! transport kind, or nothing but a system-wide "something changed" broadcast
//! that forces the listener to poll. One tier is selected at session start
//! from the platform's capability flags and never switched afterwards; all
//! three are normalized into the same [`LinkSignal`] vocabulary before the
//! reconciler sees them.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::state::TransportKind;

/// Normalized connectivity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSignal {
    /// A network became the active one (or was already attached at poll time).
    Available(TransportKind),
    /// The existing network went away.
    Lost,
    /// No candidate network exists at all. Reconciled identically to `Lost`;
    /// kept distinct because push platforms report it separately.
    Unavailable,
}

/// Answers "what link is attached right now".
///
/// `None` covers both "no network attached" and "the platform connectivity
/// service is missing" — the reconciler treats either as disconnected and
/// never errors outward.
pub trait LinkQuery: Send + Sync {
    fn current_link(&self) -> Option<TransportKind>;
}

/// Receives normalized signals. Implemented by the engine handle; delivery is
/// non-blocking and silently dropped once the receiving session is gone.
pub trait SignalSink: Send + Sync {
    fn deliver(&self, signal: LinkSignal);
}

// ─── Capability tiers ────────────────────────────────────────────────────────

/// Platform notification capabilities, probed once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Platform pushes availability/loss for the best current network.
    pub push_unified: bool,
    /// Platform pushes only for explicitly registered transport kinds.
    pub push_filtered: bool,
}

/// The selected signal-source variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTier {
    UnifiedPush,
    FilteredPush,
    Poll,
}

impl SourceTier {
    /// Pick the best tier the platform supports. Called once per session;
    /// tiers are never switched at runtime.
    pub fn select(caps: Capabilities) -> Self {
        if caps.push_unified {
            Self::UnifiedPush
        } else if caps.push_filtered {
            Self::FilteredPush
        } else {
            Self::Poll
        }
    }
}

// ─── Push registration ───────────────────────────────────────────────────────

/// Hand-off point for push-capable platforms: the platform glue calls these
/// from its native callbacks. Each call is forwarded to the session's
/// reconciler; calls into a stopped session are no-ops.
#[derive(Clone)]
pub struct PushRegistration {
    sink: Arc<dyn SignalSink>,
}

impl PushRegistration {
    pub fn link_available(&self, transport: TransportKind) {
        self.sink.deliver(LinkSignal::Available(transport));
    }

    pub fn link_lost(&self) {
        self.sink.deliver(LinkSignal::Lost);
    }

    pub fn link_unavailable(&self) {
        self.sink.deliver(LinkSignal::Unavailable);
    }
}

// ─── Source + subscription ───────────────────────────────────────────────────

/// A capability-tier-selected signal source bound to one platform link query.
pub struct SignalSource {
    tier: SourceTier,
    poll_interval: Duration,
}

impl SignalSource {
    pub fn new(tier: SourceTier, poll_interval: Duration) -> Self {
        Self {
            tier,
            poll_interval,
        }
    }

    pub fn tier(&self) -> SourceTier {
        self.tier
    }

    /// Register `sink` with the platform mechanism for this tier.
    ///
    /// Push tiers hand out a [`PushRegistration`]; the filtered tier also
    /// queries current connectivity synchronously and synthesizes
    /// `Unavailable` when nothing is attached, because filtered registration
    /// callbacks omit the initial state announcement. The poll tier spawns a
    /// background task whose first tick fires immediately, which serves the
    /// same purpose.
    pub fn subscribe(
        &self,
        query: Arc<dyn LinkQuery>,
        sink: Arc<dyn SignalSink>,
    ) -> Subscription {
        match self.tier {
            SourceTier::UnifiedPush => Subscription {
                registration: Some(PushRegistration { sink }),
                poll_task: None,
            },
            SourceTier::FilteredPush => {
                if query.current_link().is_none() {
                    debug!("no link at registration, synthesizing unavailable");
                    sink.deliver(LinkSignal::Unavailable);
                }
                Subscription {
                    registration: Some(PushRegistration { sink }),
                    poll_task: None,
                }
            }
            SourceTier::Poll => Subscription {
                registration: None,
                poll_task: Some(spawn_poll_task(query, sink, self.poll_interval)),
            },
        }
    }
}

/// Live registration with a signal source. Dropping it releases the poll task
/// (push registrations die with their sink — the stopped engine ignores
/// deliveries).
pub struct Subscription {
    registration: Option<PushRegistration>,
    poll_task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// The push hand-off point, when the selected tier is push-capable.
    pub fn registration(&self) -> Option<PushRegistration> {
        self.registration.clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }
}

/// Poll loop for legacy platforms: query the link on an interval and emit a
/// signal only when the answer changes. The first tick fires immediately so a
/// fresh session always gets an initial signal.
fn spawn_poll_task(
    query: Arc<dyn LinkQuery>,
    sink: Arc<dyn SignalSink>,
    poll_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        let mut last: Option<Option<TransportKind>> = None;
        loop {
            interval.tick().await;
            let now = query.current_link();
            if last == Some(now) {
                continue;
            }
            match now {
                Some(transport) => {
                    debug!(%transport, "poll observed link");
                    sink.deliver(LinkSignal::Available(transport));
                }
                // Lost only when a link was previously seen; before that the
                // platform simply has no candidate network.
                None if matches!(last, Some(Some(_))) => sink.deliver(LinkSignal::Lost),
                None => sink.deliver(LinkSignal::Unavailable),
            }
            last = Some(now);
        }
    })
}
