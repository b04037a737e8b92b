// SPDX-License-Identifier: MIT
//! Active reachability probe.
//!
//! One probe is one bounded-time attempt to fetch the beacon endpoint and
//! classify the outcome to a bool. The probe races the HTTP attempt against a
//! hard timeout; whichever finishes first wins and exactly one
//! [`ProbeOutcome`] is delivered. There are no retries — a caller wanting a
//! retry starts a new probe.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::ProbeConfig;
use crate::error::MonitorError;

/// Result of one probe attempt, tagged with the generation that started it so
/// the reconciler can discard completions from superseded probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub generation: u64,
    pub success: bool,
}

/// Performs the underlying reachability attempt.
///
/// Implementations never return an error: DNS, TCP, TLS, and HTTP failures
/// all collapse to `false`. The trait exists so tests can substitute a
/// deterministic prober for the real HTTP client.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn check(&self, url: &str) -> bool;
}

/// Reachability prober backed by an HTTPS GET against the beacon endpoint.
///
/// The request carries a `Connection: close` hint and a distinct client
/// identifier; only the response status is consulted, and exactly HTTP 200
/// counts as success — any other status, including other 2xx, is failure.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(config: &ProbeConfig) -> Result<Self, MonitorError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout())
            .timeout(config.connect_timeout())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn check(&self, url: &str) -> bool {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::CONNECTION, "close")
            .send()
            .await;
        match response {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                debug!(error = %e, "probe request failed");
                false
            }
        }
    }
}

/// Handle to an in-flight probe. Cancelling (or dropping) the handle
/// guarantees no outcome is delivered afterwards and releases the timeout
/// timer along with the background task.
pub struct ProbeHandle {
    generation: u64,
    cancelled: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<()>,
}

impl ProbeHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stop delivery of any pending result. Idempotent; a no-op once the
    /// outcome has already been sent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.task.abort();
    }
}

impl Drop for ProbeHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Start one probe attempt on a background task.
///
/// The task races the prober against `timeout`; the loser is dropped with the
/// task. The cancelled flag is re-checked after the race so a cancellation
/// that lands mid-request still suppresses delivery even if the abort does
/// not.
pub fn spawn_probe(
    prober: Arc<dyn Prober>,
    url: String,
    timeout: Duration,
    generation: u64,
    outcomes: mpsc::Sender<ProbeOutcome>,
) -> ProbeHandle {
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    let task = tokio::spawn(async move {
        let success = tokio::select! {
            ok = prober.check(&url) => ok,
            _ = tokio::time::sleep(timeout) => {
                debug!(generation, timeout_ms = timeout.as_millis() as u64, "probe timed out");
                false
            }
        };
        if flag.load(Ordering::Acquire) {
            return;
        }
        if outcomes.send(ProbeOutcome { generation, success }).await.is_err() {
            warn!(generation, "probe outcome dropped: reconciler gone");
        }
    });
    ProbeHandle {
        generation,
        cancelled,
        task,
    }
}
