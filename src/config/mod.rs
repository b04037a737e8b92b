use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::error::MonitorError;

const DEFAULT_PROBE_URL: &str = "https://www.google.co.in/";
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 8_000;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

fn default_user_agent() -> String {
    concat!("linkwatch/", env!("CARGO_PKG_VERSION")).to_string()
}

// ─── ProbeConfig ─────────────────────────────────────────────────────────────

/// Reachability probe configuration (`[probe]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Beacon endpoint fetched to confirm actual internet usability.
    /// Only the response status is consulted.
    pub url: String,
    /// Hard upper bound on one probe. A probe exceeding this is a definitive
    /// failure, indistinguishable from a connection error. Default: 8000.
    pub timeout_ms: u64,
    /// Connect timeout on the underlying request. Slightly longer than
    /// `timeout_ms` — the race timer is expected to fire first. Default: 10000.
    pub connect_timeout_ms: u64,
    /// Client identifier sent with every probe request.
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PROBE_URL.to_string(),
            timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            user_agent: default_user_agent(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

// ─── SignalConfig ────────────────────────────────────────────────────────────

/// Passive signal source configuration (`[signals]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Polling cadence for platforms without push notifications. Default: 5.
    pub poll_interval_secs: u64,
    /// Whether sessions process connectivity events at all. A session built
    /// with this off never registers, probes, or notifies. Default: true.
    pub enabled: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            enabled: true,
        }
    }
}

impl SignalConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

// ─── MonitorConfig ───────────────────────────────────────────────────────────

/// Top-level monitor configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub probe: ProbeConfig,
    pub signals: SignalConfig,
}

impl MonitorConfig {
    /// Load from an explicit TOML path. Missing or malformed files are errors
    /// here — use [`MonitorConfig::load_or_default`] for the absorbing variant.
    pub fn load(path: &Path) -> Result<Self, MonitorError> {
        let contents = std::fs::read_to_string(path).map_err(|source| MonitorError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| MonitorError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from a TOML path if it exists, falling back to defaults.
    ///
    /// A malformed file is logged and ignored rather than propagated — config
    /// problems must never take connectivity monitoring down.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring config file: {e}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_timings() {
        let config = MonitorConfig::default();
        assert_eq!(config.probe.timeout(), Duration::from_secs(8));
        assert_eq!(config.probe.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.probe.url, DEFAULT_PROBE_URL);
        assert!(config.signals.enabled);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[probe]\ntimeout_ms = 2000\n\n[signals]\npoll_interval_secs = 1\n",
        )
        .unwrap();

        let config = MonitorConfig::load(&path).unwrap();
        assert_eq!(config.probe.timeout_ms, 2000);
        assert_eq!(config.probe.connect_timeout_ms, DEFAULT_CONNECT_TIMEOUT_MS);
        assert_eq!(config.signals.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn malformed_file_is_absorbed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not toml at all [[[").unwrap();

        let config = MonitorConfig::load_or_default(&path);
        assert_eq!(config.probe.timeout_ms, DEFAULT_PROBE_TIMEOUT_MS);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = MonitorConfig::load_or_default(Path::new("/nonexistent/linkwatch.toml"));
        assert_eq!(config.probe.url, DEFAULT_PROBE_URL);
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let signals = SignalConfig {
            poll_interval_secs: 0,
            enabled: true,
        };
        assert_eq!(signals.poll_interval(), Duration::from_secs(1));
    }
}
