//! linkwatch — internet reachability monitoring.
//!
//! Distinguishes "a network interface is attached" from "a live internet
//! endpoint actually responds". Passive platform signals are reconciled
//! against locally held state, and an active HTTPS probe is fired only when
//! the passive signal is ambiguous. Consumers observe a single boolean
//! activity state through per-session [`NetworkChanged`] notifications, or
//! poll the last known process-wide answer without blocking.
//!
//! ```rust,no_run
//! use linkwatch::{Capabilities, Monitor, MonitorConfig};
//!
//! # async fn demo() {
//! let monitor = Monitor::new(
//!     MonitorConfig::default(),
//!     linkwatch::platform::default_link_query(),
//!     Capabilities::default(),
//! ).unwrap();
//!
//! let mut session = monitor.session();
//! let mut changes = session.subscribe();
//! session.start();
//! while let Ok(change) = changes.recv().await {
//!     println!("internet usable: {}", change.is_active);
//! }
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod platform;
pub mod probe;
pub mod session;
pub mod signal;
pub mod state;

pub use config::MonitorConfig;
pub use error::MonitorError;
pub use events::NetworkChanged;
pub use session::NetworkSession;
pub use signal::{Capabilities, LinkQuery, LinkSignal, PushRegistration, SourceTier};
pub use state::{NetworkState, TransportKind};

use std::sync::Arc;

use probe::{HttpProber, Prober};
use state::{new_shared_process_state, SharedProcessState};

/// Process-wide monitor root.
///
/// Owns the configuration, the shared last-writer-wins state register, and
/// the probe client; created once at process start and shared by every
/// observer session it vends. The register lives for the process lifetime —
/// there is no explicit destruction.
#[derive(Clone)]
pub struct Monitor {
    config: Arc<MonitorConfig>,
    process: SharedProcessState,
    prober: Arc<dyn Prober>,
    query: Arc<dyn LinkQuery>,
    capabilities: Capabilities,
}

impl Monitor {
    /// Build a monitor with the real HTTP prober.
    pub fn new(
        config: MonitorConfig,
        query: Arc<dyn LinkQuery>,
        capabilities: Capabilities,
    ) -> Result<Self, MonitorError> {
        let prober = Arc::new(HttpProber::new(&config.probe)?);
        Ok(Self::with_prober(config, query, capabilities, prober))
    }

    /// Build a monitor around a custom [`Prober`]. Seam for tests and for
    /// embedders with their own transport stack.
    pub fn with_prober(
        config: MonitorConfig,
        query: Arc<dyn LinkQuery>,
        capabilities: Capabilities,
        prober: Arc<dyn Prober>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            process: new_shared_process_state(),
            prober,
            query,
            capabilities,
        }
    }

    /// Create a fresh observer session. The session starts cold
    /// (disconnected, inactive) apart from the last known transport kind.
    pub fn session(&self) -> NetworkSession {
        NetworkSession::new(
            Arc::clone(&self.config),
            Arc::clone(&self.process),
            Arc::clone(&self.prober),
            Arc::clone(&self.query),
            self.capabilities,
        )
    }

    /// Last known process-wide answer, non-blocking and possibly stale.
    pub fn is_active_internet(&self) -> bool {
        self.process.is_active_internet()
    }

    /// Last known process-wide state snapshot.
    pub fn last_known(&self) -> NetworkState {
        self.process.snapshot()
    }
}
