// Metric probes: one signal each, every failure folded into a sentinel.

pub mod bandwidth;
pub mod dns;
pub mod echo;
pub(crate) mod linux;

use async_trait::async_trait;
use sysinfo::Networks;
use tracing::{debug, instrument};

use crate::config::ProbeConfig;
use crate::models::SENTINEL_DBM;

pub use dns::DnsOutcome;
pub use echo::EchoStats;

/// The probes one sampler cycle needs. Implementations never fail; they return sentinels.
#[async_trait]
pub trait NetworkProbes: Send + Sync {
    /// True if at least one non-loopback interface is up.
    async fn link_up(&self) -> bool;

    async fn echo(&self) -> EchoStats;

    async fn dns(&self) -> DnsOutcome;

    /// Utilization of the reference link, 0–100.
    async fn bandwidth_pct(&self) -> f64;

    /// Wireless signal level in dBm, or −999.
    async fn signal_strength_dbm(&self) -> f64;

    /// Echo probes per cycle; a link-down cycle records this many drops.
    fn echo_count(&self) -> u32;
}

/// Probes against the real host.
pub struct SystemProbes {
    config: ProbeConfig,
}

impl SystemProbes {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl NetworkProbes for SystemProbes {
    #[instrument(skip(self), fields(probe = "link"))]
    async fn link_up(&self) -> bool {
        match tokio::task::spawn_blocking(any_interface_up).await {
            Ok(up) => up,
            Err(e) => {
                debug!(error = %e, "link probe join failed");
                false
            }
        }
    }

    async fn echo(&self) -> EchoStats {
        echo::measure(&self.config).await
    }

    async fn dns(&self) -> DnsOutcome {
        dns::resolve(&self.config.dns_host, self.config.dns_timeout()).await
    }

    async fn bandwidth_pct(&self) -> f64 {
        match bandwidth::measure_bits_per_sec(self.config.bandwidth_interval()).await {
            Ok(bps) => bandwidth::utilization_pct(bps, self.config.reference_link_mbps),
            Err(e) => {
                debug!(error = %e, "bandwidth probe failed");
                bandwidth::UNKNOWN_BANDWIDTH_PCT
            }
        }
    }

    #[instrument(skip(self), fields(probe = "signal"))]
    async fn signal_strength_dbm(&self) -> f64 {
        signal_strength().await.unwrap_or(SENTINEL_DBM)
    }

    fn echo_count(&self) -> u32 {
        self.config.echo_count
    }
}

fn any_interface_up() -> bool {
    if let Some(states) = linux::interface_link_states() {
        return states.iter().any(|(_, up)| *up);
    }
    // No /sys: an interface holding a non-loopback address counts as up
    let networks = Networks::new_with_refreshed_list();
    networks.list().values().any(|data| {
        data.ip_networks()
            .iter()
            .any(|n| !n.addr.is_loopback() && !n.addr.is_unspecified())
    })
}

#[cfg(target_os = "windows")]
async fn signal_strength() -> Option<f64> {
    let output = tokio::process::Command::new("netsh")
        .args(["wlan", "show", "interfaces"])
        .kill_on_drop(true)
        .output();
    let output = tokio::time::timeout(std::time::Duration::from_secs(5), output)
        .await
        .ok()?
        .ok()?;
    parse_netsh_signal(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(not(target_os = "windows"))]
async fn signal_strength() -> Option<f64> {
    tokio::task::spawn_blocking(linux::read_wireless_level_dbm)
        .await
        .ok()
        .flatten()
}

/// `Signal : 85%` → dBm, using the same linear quality mapping Windows tools use.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn parse_netsh_signal(output: &str) -> Option<f64> {
    let line = output.lines().find(|l| l.trim_start().starts_with("Signal"))?;
    let (_, value) = line.split_once(':')?;
    let percent: f64 = value.trim().trim_end_matches('%').parse().ok()?;
    Some(-100.0 + percent * 0.7)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn netsh_signal_percent_maps_to_dbm() {
        let out = "    Name                   : Wi-Fi\n    State                  : connected\n    Signal                 : 80%\n";
        let dbm = parse_netsh_signal(out).unwrap();
        assert!((dbm - (-44.0)).abs() < 1e-9);
    }

    #[test]
    fn netsh_signal_missing() {
        assert_eq!(parse_netsh_signal("There is no wireless interface on the system."), None);
    }
}
