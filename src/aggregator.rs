// Window reduction: a run's raw samples into one observation.

use crate::models::{ErrorKind, RawSample, WindowedObservation};

/// Reduces a window of samples.
///
/// Gauges (latency, jitter, dns, bandwidth, signal) are averaged; packet loss and drops take
/// the worst sample; `connected` holds only if every sample was connected; `error_kind` is the
/// most severe kind seen. An empty window yields [`WindowedObservation::degraded`].
pub fn aggregate(samples: &[RawSample]) -> WindowedObservation {
    if samples.is_empty() {
        return WindowedObservation::degraded();
    }

    let latency_ms = mean_f64(&samples.iter().map(|s| s.latency_ms).collect::<Vec<_>>());
    let jitter_ms = mean_f64(&samples.iter().map(|s| s.jitter_ms).collect::<Vec<_>>());
    let dns_time_ms = mean_f64(&samples.iter().map(|s| s.dns_time_ms).collect::<Vec<_>>());
    let bandwidth_pct = mean_f64(&samples.iter().map(|s| s.bandwidth_pct).collect::<Vec<_>>());
    let signal_strength_dbm = mean_f64(
        &samples
            .iter()
            .map(|s| s.signal_strength_dbm)
            .collect::<Vec<_>>(),
    );

    let packet_loss_pct = max_f64(samples.iter().map(|s| s.packet_loss_pct));
    let connection_drops = samples.iter().map(|s| s.connection_drops).max().unwrap_or(0);
    let connected = samples.iter().all(|s| s.connected);
    let error_kind = samples
        .iter()
        .map(|s| s.error_kind)
        .max_by_key(|k| k.severity())
        .unwrap_or(ErrorKind::None);

    WindowedObservation {
        latency_ms,
        jitter_ms,
        packet_loss_pct,
        connected,
        dns_time_ms,
        bandwidth_pct,
        signal_strength_dbm,
        connection_drops,
        error_kind,
        sample_count: samples.len(),
    }
}

fn mean_f64(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / v.len() as f64
}

/// Max that lets a NaN through instead of silently dropping it, so the encoder can impute it.
fn max_f64(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::NEG_INFINITY, |acc, x| {
        if x.is_nan() || acc.is_nan() {
            f64::NAN
        } else {
            acc.max(x)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_f64_empty_is_zero() {
        assert_eq!(mean_f64(&[]), 0.0);
    }

    #[test]
    fn max_f64_propagates_nan() {
        assert!(max_f64([1.0, f64::NAN, 3.0].into_iter()).is_nan());
        assert_eq!(max_f64([1.0, 7.5, 3.0].into_iter()), 7.5);
    }
}
