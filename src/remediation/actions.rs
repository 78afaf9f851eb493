// Static label → action catalogue.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::RemediationStep;
use super::steps::{AdapterList, Advisory, CommandStep, NetworkLoad, NoOp, SocketProcesses};
use crate::config::RemediationConfig;
use crate::models::Label;

/// Network-load analysis window.
pub const LOAD_WINDOW: Duration = Duration::from_secs(5);
/// Load above this is reported as high.
pub const LOAD_WARN_MBPS: f64 = 50.0;
/// Processes listed for bandwidth saturation.
pub const SOCKET_PROCESS_LIMIT: usize = 5;

/// Which step a label runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    NoOp,
    Advisory,
    PingBurst,
    NetworkLoad,
    FlushDns,
    SocketProcesses,
    FirewallRules,
    Traceroute,
    AdapterList,
}

/// Shape of what the step reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputShape {
    Text,
    List,
    None,
}

impl StepKind {
    pub fn output_shape(self) -> OutputShape {
        match self {
            StepKind::NoOp => OutputShape::None,
            StepKind::SocketProcesses | StepKind::AdapterList => OutputShape::List,
            _ => OutputShape::Text,
        }
    }
}

/// One catalogue entry, as served by `GET /api/remediation`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationAction {
    pub label: Label,
    pub description: &'static str,
    pub step: StepKind,
    pub output: OutputShape,
}

pub fn action_for(label: Label) -> RemediationAction {
    let (description, step) = match label {
        Label::Normal => ("No issues detected.", StepKind::NoOp),
        Label::MinorUnstable => (
            "Minor fluctuations. Check Wi-Fi or reboot router.",
            StepKind::Advisory,
        ),
        Label::SevereUnstable => (
            "Severe instability. Run diagnostic or contact ISP.",
            StepKind::PingBurst,
        ),
        Label::HighLatency => ("High delay. Reduce network load.", StepKind::NetworkLoad),
        Label::RouterDown => ("Router offline. Restart router.", StepKind::Advisory),
        Label::IspFailure => ("ISP disruption. Contact support.", StepKind::Advisory),
        Label::DnsFailure => ("DNS failed. Flush DNS or use 8.8.8.8.", StepKind::FlushDns),
        Label::BandwidthSaturation => ("Bandwidth maxed. Limit apps.", StepKind::SocketProcesses),
        Label::IntermittentConnectivity => {
            ("Frequent drops. Check cables.", StepKind::PingBurst)
        }
        Label::FirewallBlocking => ("Firewall blocking. Check rules.", StepKind::FirewallRules),
        Label::ServerUnreachable => (
            "Server down. Verify status or check network path.",
            StepKind::Traceroute,
        ),
        Label::HardwareFault => ("Hardware issue. Inspect equipment.", StepKind::AdapterList),
    };
    RemediationAction {
        label,
        description,
        step,
        output: step.output_shape(),
    }
}

pub fn catalogue() -> Vec<RemediationAction> {
    Label::ALL.into_iter().map(action_for).collect()
}

/// Advice printed by advisory steps.
fn advice(label: Label) -> &'static str {
    match label {
        Label::MinorUnstable => "Check Wi-Fi signal quality or reboot the router.",
        Label::RouterDown => "Restart the router and confirm its status lights.",
        Label::IspFailure => "Check the ISP status page or call support.",
        _ => "No action needed.",
    }
}

/// The real step for every label.
pub fn default_steps(config: &RemediationConfig) -> HashMap<Label, Arc<dyn RemediationStep>> {
    Label::ALL
        .into_iter()
        .map(|label| (label, build_step(label, config)))
        .collect()
}

fn build_step(label: Label, config: &RemediationConfig) -> Arc<dyn RemediationStep> {
    match action_for(label).step {
        StepKind::NoOp => Arc::new(NoOp),
        StepKind::Advisory => Arc::new(Advisory {
            text: advice(label),
        }),
        StepKind::PingBurst => Arc::new(ping_burst(&config.ping_target, config.ping_count)),
        StepKind::NetworkLoad => Arc::new(NetworkLoad {
            window: LOAD_WINDOW,
            warn_mbps: LOAD_WARN_MBPS,
        }),
        StepKind::FlushDns => Arc::new(flush_dns()),
        StepKind::SocketProcesses => Arc::new(SocketProcesses {
            limit: SOCKET_PROCESS_LIMIT,
        }),
        StepKind::FirewallRules => Arc::new(firewall_rules()),
        StepKind::Traceroute => Arc::new(traceroute(&config.trace_target)),
        StepKind::AdapterList => Arc::new(AdapterList),
    }
}

fn ping_burst(target: &str, count: u32) -> CommandStep {
    let count = count.to_string();
    #[cfg(target_os = "windows")]
    let flag = "-n";
    #[cfg(not(target_os = "windows"))]
    let flag = "-c";
    CommandStep::new("ping", [flag, count.as_str(), target])
}

#[cfg(target_os = "windows")]
fn flush_dns() -> CommandStep {
    CommandStep::new("ipconfig", ["/flushdns"])
}

#[cfg(target_os = "macos")]
fn flush_dns() -> CommandStep {
    CommandStep::new("dscacheutil", ["-flushcache"])
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn flush_dns() -> CommandStep {
    CommandStep::new("resolvectl", ["flush-caches"])
}

#[cfg(target_os = "windows")]
fn firewall_rules() -> CommandStep {
    CommandStep::new("netsh", ["advfirewall", "show", "allprofiles"])
}

#[cfg(target_os = "macos")]
fn firewall_rules() -> CommandStep {
    CommandStep::new("/usr/libexec/ApplicationFirewall/socketfilterfw", ["--getglobalstate"])
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn firewall_rules() -> CommandStep {
    CommandStep::new("nft", ["list", "ruleset"])
}

fn traceroute(target: &str) -> CommandStep {
    #[cfg(target_os = "windows")]
    let program = "tracert";
    #[cfg(not(target_os = "windows"))]
    let program = "traceroute";
    CommandStep::new(program, [target])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_covers_every_label_once() {
        let c = catalogue();
        assert_eq!(c.len(), Label::ALL.len());
        for (entry, label) in c.iter().zip(Label::ALL) {
            assert_eq!(entry.label, label);
        }
    }

    #[test]
    fn normal_is_noop() {
        let a = action_for(Label::Normal);
        assert_eq!(a.step, StepKind::NoOp);
        assert_eq!(a.output, OutputShape::None);
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn ping_burst_uses_configured_count() {
        assert_eq!(ping_burst("1.1.1.1", 10).command_line(), "ping -c 10 1.1.1.1");
    }
}
