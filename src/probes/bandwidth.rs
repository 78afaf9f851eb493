// Bandwidth utilization from interface byte-counter deltas.

use std::time::{Duration, Instant};
use sysinfo::Networks;
use tracing::instrument;

use crate::error::ProbeError;

/// Reported when the counters cannot be read.
pub const UNKNOWN_BANDWIDTH_PCT: f64 = 50.0;

const BITS_PER_MEGABIT: f64 = 1024.0 * 1024.0;

/// Total bits/sec (rx + tx, all interfaces) over `interval`.
///
/// Each call owns its own `Networks` baseline, so concurrent callers never share counter reads.
#[instrument(fields(probe = "bandwidth"))]
pub async fn measure_bits_per_sec(interval: Duration) -> Result<f64, ProbeError> {
    let (networks, first) = tokio::task::spawn_blocking(|| {
        let networks = Networks::new_with_refreshed_list();
        let total = total_bytes(&networks);
        (networks, total)
    })
    .await
    .map_err(|e| ProbeError::Failed(format!("sysinfo task join: {}", e)))?;
    let started = Instant::now();

    tokio::time::sleep(interval).await;

    let second = tokio::task::spawn_blocking(move || {
        let mut networks = networks;
        networks.refresh(true);
        total_bytes(&networks)
    })
    .await
    .map_err(|e| ProbeError::Failed(format!("sysinfo task join: {}", e)))?;

    let secs = started.elapsed().as_secs_f64();
    if secs <= 0.0 {
        return Err(ProbeError::Failed("zero-length measurement interval".into()));
    }
    Ok(second.saturating_sub(first) as f64 * 8.0 / secs)
}

/// Share of the reference link speed, clamped to 0–100.
pub fn utilization_pct(bits_per_sec: f64, reference_link_mbps: u64) -> f64 {
    let max = reference_link_mbps as f64 * BITS_PER_MEGABIT;
    if max <= 0.0 || !bits_per_sec.is_finite() {
        return UNKNOWN_BANDWIDTH_PCT;
    }
    (bits_per_sec / max * 100.0).clamp(0.0, 100.0)
}

/// Megabits per second, same binary megabit as [`utilization_pct`].
pub fn to_mbps(bits_per_sec: f64) -> f64 {
    bits_per_sec / BITS_PER_MEGABIT
}

fn total_bytes(networks: &Networks) -> u64 {
    networks
        .list()
        .values()
        .map(|data| data.total_received().saturating_add(data.total_transmitted()))
        .fold(0u64, u64::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utilization_scales_against_reference() {
        // 50 Mbit/s on a 100 Mbit reference
        let pct = utilization_pct(50.0 * BITS_PER_MEGABIT, 100);
        assert!((pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn utilization_clamps_at_100() {
        assert_eq!(utilization_pct(500.0 * BITS_PER_MEGABIT, 100), 100.0);
    }

    #[test]
    fn utilization_idle_link_is_zero() {
        assert_eq!(utilization_pct(0.0, 100), 0.0);
    }

    #[test]
    fn utilization_non_finite_is_unknown() {
        assert_eq!(utilization_pct(f64::NAN, 100), UNKNOWN_BANDWIDTH_PCT);
    }
}
