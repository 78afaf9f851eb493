// Echo (ping) probe: round-trip latency, jitter and packet loss over a short burst.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::models::{SENTINEL_MS, TOTAL_LOSS_PCT};

/// Extra time allowed for the `ping` process itself on top of its own reply timeout.
const PROCESS_SLACK: Duration = Duration::from_millis(500);

/// Summary of one echo burst.
#[derive(Debug, Clone, PartialEq)]
pub struct EchoStats {
    pub latency_ms: f64,
    pub jitter_ms: f64,
    pub packet_loss_pct: f64,
    pub sent: u32,
    pub received: u32,
}

impl EchoStats {
    /// Probes that got no reply.
    pub fn drops(&self) -> u32 {
        self.sent.saturating_sub(self.received)
    }
}

/// Sends `echo_count` single-packet pings, one after another, and summarizes them.
#[instrument(skip(config), fields(probe = "echo", target = %config.echo_target, count = config.echo_count))]
pub async fn measure(config: &ProbeConfig) -> EchoStats {
    let mut rtts = Vec::with_capacity(config.echo_count as usize);
    let mut sent = 0u32;

    for i in 0..config.echo_count {
        sent += 1;
        match ping_once(&config.echo_target, config.echo_timeout()).await {
            Ok(rtt) => rtts.push(rtt),
            Err(e) => debug!(error = %e, attempt = i, "echo probe lost"),
        }
        if i + 1 < config.echo_count {
            tokio::time::sleep(config.echo_gap()).await;
        }
    }

    summarize(&rtts, sent)
}

/// Latency = mean RTT, jitter = population std-dev, loss = unanswered share.
pub fn summarize(rtts: &[f64], sent: u32) -> EchoStats {
    let received = rtts.len() as u32;
    let latency_ms = if rtts.is_empty() {
        SENTINEL_MS
    } else {
        rtts.iter().sum::<f64>() / rtts.len() as f64
    };
    let jitter_ms = if rtts.len() < 2 {
        SENTINEL_MS
    } else {
        let var = rtts.iter().map(|r| (r - latency_ms).powi(2)).sum::<f64>() / rtts.len() as f64;
        var.sqrt()
    };
    let packet_loss_pct = if sent == 0 {
        TOTAL_LOSS_PCT
    } else {
        f64::from(sent.saturating_sub(received)) / f64::from(sent) * 100.0
    };
    EchoStats {
        latency_ms,
        jitter_ms,
        packet_loss_pct,
        sent,
        received,
    }
}

async fn ping_once(target: &str, reply_timeout: Duration) -> Result<f64, ProbeError> {
    let mut cmd = Command::new("ping");
    cmd.args(ping_args(target, reply_timeout))
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let limit = reply_timeout + PROCESS_SLACK;
    let output = tokio::time::timeout(limit, cmd.output())
        .await
        .map_err(|_| ProbeError::Timeout(limit))?
        .map_err(|e| ProbeError::Failed(format!("spawn ping: {}", e)))?;

    if !output.status.success() {
        return Err(ProbeError::Failed(format!(
            "ping exited with {:?}",
            output.status.code()
        )));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_rtt_ms(&stdout).ok_or_else(|| ProbeError::Failed("no round-trip time in output".into()))
}

fn ping_args(target: &str, reply_timeout: Duration) -> Vec<String> {
    let millis = reply_timeout.as_millis().max(1);
    #[cfg(target_os = "windows")]
    {
        vec![
            "-n".into(),
            "1".into(),
            "-w".into(),
            millis.to_string(),
            target.into(),
        ]
    }
    #[cfg(target_os = "macos")]
    {
        vec![
            "-c".into(),
            "1".into(),
            "-W".into(),
            millis.to_string(),
            target.into(),
        ]
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // iputils takes whole seconds
        let secs = millis.div_ceil(1000);
        vec![
            "-c".into(),
            "1".into(),
            "-W".into(),
            secs.to_string(),
            target.into(),
        ]
    }
}

/// Extracts the round-trip time from one reply line (`time=12.3 ms`, `time<1ms`).
pub(crate) fn parse_rtt_ms(output: &str) -> Option<f64> {
    for line in output.lines() {
        let Some(idx) = line.find("time=").or_else(|| line.find("time<")) else {
            continue;
        };
        let rest = &line[idx + 5..];
        let token = rest.split_whitespace().next()?;
        let value = token.trim_end_matches("ms");
        if let Ok(ms) = value.parse::<f64>() {
            return Some(ms);
        }
    }
    None
}
