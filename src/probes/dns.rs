// DNS resolution probe.

use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use crate::models::SENTINEL_MS;

/// Result of resolving the probe hostname once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DnsOutcome {
    Resolved { elapsed_ms: f64 },
    /// The resolver answered with an error or no addresses.
    Failed,
    TimedOut,
}

impl DnsOutcome {
    /// Resolution time, or the sentinel when nothing resolved.
    pub fn time_ms(&self) -> f64 {
        match self {
            DnsOutcome::Resolved { elapsed_ms } => *elapsed_ms,
            DnsOutcome::Failed | DnsOutcome::TimedOut => SENTINEL_MS,
        }
    }
}

#[instrument(fields(probe = "dns"))]
pub async fn resolve(host: &str, timeout: Duration) -> DnsOutcome {
    let start = Instant::now();
    let lookup = tokio::net::lookup_host((host, 80));
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(mut addrs)) => {
            if addrs.next().is_some() {
                DnsOutcome::Resolved {
                    elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
                }
            } else {
                debug!(host, "dns lookup returned no addresses");
                DnsOutcome::Failed
            }
        }
        Ok(Err(e)) => {
            debug!(host, error = %e, "dns lookup failed");
            DnsOutcome::Failed
        }
        Err(_) => {
            debug!(host, ?timeout, "dns lookup timed out");
            DnsOutcome::TimedOut
        }
    }
}
