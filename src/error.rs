//! Library error type.
//!
//! Errors here are setup-time only (config files, HTTP client construction).
//! Runtime connectivity failures are never surfaced as errors — the consumer
//! only ever sees a boolean activity state.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("could not read config file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not build probe HTTP client: {0}")]
    ProbeClient(#[from] reqwest::Error),
}
