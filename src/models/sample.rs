// Raw per-cycle samples and the windowed observation they reduce to.

use serde::{Deserialize, Serialize};

/// "Unmeasurable" value for latency, jitter and DNS time.
pub const SENTINEL_MS: f64 = 999.0;
/// "Unavailable" value for signal strength.
pub const SENTINEL_DBM: f64 = -999.0;
/// Packet loss reported when nothing got through.
pub const TOTAL_LOSS_PCT: f64 = 100.0;
/// Drops recorded for a cycle that never reached the echo probe (one per skipped echo).
pub const DEFAULT_DEGRADED_DROPS: u32 = 5;

/// Categorical network error, ordered by severity (`Refused` is worst).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    #[default]
    None,
    Timeout,
    Unreachable,
    Refused,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 4] = [
        ErrorKind::None,
        ErrorKind::Timeout,
        ErrorKind::Unreachable,
        ErrorKind::Refused,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::None => "none",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unreachable => "unreachable",
            ErrorKind::Refused => "refused",
        }
    }

    /// Position in the severity ranking `none < timeout < unreachable < refused`.
    pub fn severity(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One probe cycle's measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSample {
    pub latency_ms: f64,
    pub jitter_ms: f64,
    pub packet_loss_pct: f64,
    pub connected: bool,
    pub dns_time_ms: f64,
    pub bandwidth_pct: f64,
    pub signal_strength_dbm: f64,
    pub connection_drops: u32,
    pub error_kind: ErrorKind,
}

impl RawSample {
    /// Sample recorded when the link-state probe reports no interface up.
    pub fn link_down(connection_drops: u32) -> Self {
        Self {
            latency_ms: SENTINEL_MS,
            jitter_ms: SENTINEL_MS,
            packet_loss_pct: TOTAL_LOSS_PCT,
            connected: false,
            dns_time_ms: SENTINEL_MS,
            bandwidth_pct: 0.0,
            signal_strength_dbm: SENTINEL_DBM,
            connection_drops,
            error_kind: ErrorKind::Unreachable,
        }
    }
}

/// A whole window reduced to one record; same fields as [`RawSample`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowedObservation {
    pub latency_ms: f64,
    pub jitter_ms: f64,
    pub packet_loss_pct: f64,
    pub connected: bool,
    pub dns_time_ms: f64,
    pub bandwidth_pct: f64,
    pub signal_strength_dbm: f64,
    pub connection_drops: u32,
    pub error_kind: ErrorKind,
    /// Number of samples the window was reduced from.
    pub sample_count: usize,
}

impl WindowedObservation {
    /// Fully degraded observation: every sentinel, disconnected, unreachable.
    pub fn degraded() -> Self {
        let s = RawSample::link_down(DEFAULT_DEGRADED_DROPS);
        Self {
            latency_ms: s.latency_ms,
            jitter_ms: s.jitter_ms,
            packet_loss_pct: s.packet_loss_pct,
            connected: s.connected,
            dns_time_ms: s.dns_time_ms,
            bandwidth_pct: s.bandwidth_pct,
            signal_strength_dbm: s.signal_strength_dbm,
            connection_drops: s.connection_drops,
            error_kind: s.error_kind,
            sample_count: 0,
        }
    }
}
