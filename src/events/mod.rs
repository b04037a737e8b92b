use chrono::Utc;
use tokio::sync::broadcast;

use crate::state::TransportKind;

/// Notification delivered to session consumers when reconciliation settles on
/// a new answer to "is the internet usable".
#[derive(Debug, Clone, serde::Serialize)]
pub struct NetworkChanged {
    /// The reconciled answer. This is the only value consumers should act on.
    pub is_active: bool,
    /// Transport the answer was reached on.
    pub transport: TransportKind,
    /// ISO-8601 timestamp when the transition was published.
    pub changed_at: String,
}

/// Broadcasts [`NetworkChanged`] events to all subscribers of one session.
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<NetworkChanged>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Publish a transition to all subscribers.
    pub fn notify(&self, is_active: bool, transport: TransportKind) {
        // Ignore errors — no subscribers is fine
        let _ = self.tx.send(NetworkChanged {
            is_active,
            transport,
            changed_at: Utc::now().to_rfc3339(),
        });
    }

    /// Subscribe to all change events.
    pub fn subscribe(&self) -> broadcast::Receiver<NetworkChanged> {
        self.tx.subscribe()
    }
}
