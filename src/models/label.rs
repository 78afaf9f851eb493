// Closed set of diagnosis labels.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Failure category produced by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Normal")]
    Normal,
    #[serde(rename = "Minor Unstable")]
    MinorUnstable,
    #[serde(rename = "Severe Unstable")]
    SevereUnstable,
    #[serde(rename = "High Latency")]
    HighLatency,
    #[serde(rename = "Router Down")]
    RouterDown,
    #[serde(rename = "ISP Failure")]
    IspFailure,
    #[serde(rename = "DNS Failure")]
    DnsFailure,
    #[serde(rename = "Bandwidth Saturation")]
    BandwidthSaturation,
    #[serde(rename = "Intermittent Connectivity")]
    IntermittentConnectivity,
    #[serde(rename = "Firewall Blocking")]
    FirewallBlocking,
    #[serde(rename = "Server Unreachable")]
    ServerUnreachable,
    #[serde(rename = "Hardware Fault")]
    HardwareFault,
}

impl Label {
    pub const ALL: [Label; 12] = [
        Label::Normal,
        Label::MinorUnstable,
        Label::SevereUnstable,
        Label::HighLatency,
        Label::RouterDown,
        Label::IspFailure,
        Label::DnsFailure,
        Label::BandwidthSaturation,
        Label::IntermittentConnectivity,
        Label::FirewallBlocking,
        Label::ServerUnreachable,
        Label::HardwareFault,
    ];

    /// Display name, as used in model artifacts.
    pub fn name(self) -> &'static str {
        match self {
            Label::Normal => "Normal",
            Label::MinorUnstable => "Minor Unstable",
            Label::SevereUnstable => "Severe Unstable",
            Label::HighLatency => "High Latency",
            Label::RouterDown => "Router Down",
            Label::IspFailure => "ISP Failure",
            Label::DnsFailure => "DNS Failure",
            Label::BandwidthSaturation => "Bandwidth Saturation",
            Label::IntermittentConnectivity => "Intermittent Connectivity",
            Label::FirewallBlocking => "Firewall Blocking",
            Label::ServerUnreachable => "Server Unreachable",
            Label::HardwareFault => "Hardware Fault",
        }
    }

    /// URL-friendly form, e.g. `router-down`.
    pub fn slug(self) -> String {
        self.name().to_lowercase().replace(' ', "-")
    }

    /// Labels describing a link that is down or a path that is fully broken.
    pub fn is_link_degraded(self) -> bool {
        matches!(
            self,
            Label::RouterDown | Label::IspFailure | Label::ServerUnreachable | Label::HardwareFault
        )
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown label: {0:?}")]
pub struct UnknownLabel(pub String);

impl FromStr for Label {
    type Err = UnknownLabel;

    /// Accepts the display name or the slug, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', '_'], " ");
        Label::ALL
            .into_iter()
            .find(|l| l.name().to_lowercase() == wanted)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}
