// SPDX-License-Identifier: MIT
//! Network state model.
//!
//! Two independently-lived copies of [`NetworkState`] exist at runtime: a
//! process-wide copy ([`ProcessState`]) that survives across observer
//! sessions, and a per-session copy owned by the reconciler task. The
//! process-wide copy is a last-writer-wins register — every completed probe
//! overwrites it unconditionally, and any session may snapshot it at any time
//! without blocking.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Coarse category of the attached network transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Wifi,
    Mobile,
    Unknown,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wifi => write!(f, "wifi"),
            Self::Mobile => write!(f, "mobile"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Snapshot of connectivity as seen by one owner.
///
/// Invariant: `is_active` implies `is_connected` — the engine never reports a
/// usable internet over a detached link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct NetworkState {
    /// A network transport is attached (link-layer signal).
    pub is_connected: bool,
    /// The most recent reachability probe succeeded; internet is usable.
    pub is_active: bool,
    /// Which transport is attached.
    pub transport: TransportKind,
}

impl Default for NetworkState {
    fn default() -> Self {
        Self {
            is_connected: false,
            is_active: false,
            transport: TransportKind::Unknown,
        }
    }
}

impl NetworkState {
    /// State for an attached but not yet verified link.
    pub fn connected(transport: TransportKind) -> Self {
        Self {
            is_connected: true,
            is_active: false,
            transport,
        }
    }
}

// Bit layout for the packed register: bit 0 = connected, bit 1 = active,
// bits 2-3 = transport (0 unknown, 1 wifi, 2 mobile).
fn encode(state: NetworkState) -> u8 {
    let transport = match state.transport {
        TransportKind::Unknown => 0u8,
        TransportKind::Wifi => 1,
        TransportKind::Mobile => 2,
    };
    (state.is_connected as u8) | ((state.is_active as u8) << 1) | (transport << 2)
}

fn decode(bits: u8) -> NetworkState {
    NetworkState {
        is_connected: bits & 0b01 != 0,
        is_active: bits & 0b10 != 0,
        transport: match (bits >> 2) & 0b11 {
            1 => TransportKind::Wifi,
            2 => TransportKind::Mobile,
            _ => TransportKind::Unknown,
        },
    }
}

/// Process-wide network state register.
///
/// A single `AtomicU8` holding the packed [`NetworkState`]. Writers race with
/// last-writer-wins semantics and readers never block — the value is an
/// approximate liveness indicator, not a correctness-critical one.
#[derive(Debug, Default)]
pub struct ProcessState {
    bits: AtomicU8,
}

/// Shared handle to the process-wide register.
pub type SharedProcessState = Arc<ProcessState>;

pub fn new_shared_process_state() -> SharedProcessState {
    Arc::new(ProcessState::default())
}

impl ProcessState {
    /// Non-blocking snapshot of the last known state. May be stale.
    pub fn snapshot(&self) -> NetworkState {
        decode(self.bits.load(Ordering::Acquire))
    }

    /// Overwrite the register unconditionally.
    pub fn store(&self, state: NetworkState) {
        self.bits.store(encode(state), Ordering::Release);
    }

    /// Last known answer to "is the internet usable right now".
    pub fn is_active_internet(&self) -> bool {
        self.snapshot().is_active
    }
}

/// Apply a completed probe to the session copy and mirror the result into the
/// process-wide register.
///
/// Both copies end up with identical values; the register is overwritten
/// unconditionally (last-probe-wins across sessions). `is_active` is clamped
/// to `is_connected` so the invariant holds even if a stale success slips
/// through.
pub fn merge_probe_result(
    session: &mut NetworkState,
    process: &ProcessState,
    success: bool,
) -> NetworkState {
    session.is_active = success && session.is_connected;
    process.store(*session);
    *session
}
