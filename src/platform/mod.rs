//! Platform link queries.
//!
//! The OS connectivity service is an external collaborator; these are the
//! stock [`LinkQuery`] implementations the CLI uses. Embedders
//! on push-capable platforms supply their own and drive a
//! [`PushRegistration`](crate::signal::PushRegistration) instead.

use crate::signal::LinkQuery;
use crate::state::TransportKind;

/// Always reports no link. Stand-in for a missing connectivity service.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLinkQuery;

impl LinkQuery for NullLinkQuery {
    fn current_link(&self) -> Option<TransportKind> {
        None
    }
}

/// Linux link query over `/sys/class/net`.
///
/// An interface counts as attached when its `operstate` is `up`. Transport is
/// classified from the interface name: `wl*` is wifi, `ww*`/`rmnet*` is
/// mobile, anything else attached is unknown. Wifi is preferred when several
/// interfaces are up. Any filesystem error is absorbed as "no link".
#[cfg(target_os = "linux")]
#[derive(Debug, Default, Clone, Copy)]
pub struct SysfsLinkQuery;

#[cfg(target_os = "linux")]
impl SysfsLinkQuery {
    fn classify(name: &str) -> TransportKind {
        if name.starts_with("wl") {
            TransportKind::Wifi
        } else if name.starts_with("ww") || name.starts_with("rmnet") {
            TransportKind::Mobile
        } else {
            TransportKind::Unknown
        }
    }

    fn scan() -> std::io::Result<Option<TransportKind>> {
        let mut best: Option<TransportKind> = None;
        for entry in std::fs::read_dir("/sys/class/net")? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == "lo" {
                continue;
            }
            let operstate = std::fs::read_to_string(entry.path().join("operstate"))?;
            if operstate.trim() != "up" {
                continue;
            }
            let transport = Self::classify(&name);
            if transport == TransportKind::Wifi {
                return Ok(Some(transport));
            }
            best.get_or_insert(transport);
        }
        Ok(best)
    }
}

#[cfg(target_os = "linux")]
impl LinkQuery for SysfsLinkQuery {
    fn current_link(&self) -> Option<TransportKind> {
        match Self::scan() {
            Ok(link) => link,
            Err(e) => {
                tracing::debug!(error = %e, "sysfs scan failed, treating as no link");
                None
            }
        }
    }
}

/// Best available stock query for the current platform.
pub fn default_link_query() -> std::sync::Arc<dyn LinkQuery> {
    #[cfg(target_os = "linux")]
    {
        std::sync::Arc::new(SysfsLinkQuery)
    }
    #[cfg(not(target_os = "linux"))]
    {
        std::sync::Arc::new(NullLinkQuery)
    }
}
