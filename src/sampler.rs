// Sampler: drives the probes on a fixed cadence for one diagnosis window.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, instrument, warn};

use crate::config::SamplingConfig;
use crate::models::{DiagnosisEvent, ErrorKind, RawSample};
use crate::probes::{DnsOutcome, EchoStats, NetworkProbes};

/// Latency or DNS time above this marks a cycle as `timeout`.
const SLOW_RESPONSE_MS: f64 = 200.0;

/// Window timing and the optional per-run sample log.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub duration: Duration,
    pub interval: Duration,
    pub sample_log: Option<PathBuf>,
}

impl From<&SamplingConfig> for SamplerConfig {
    fn from(c: &SamplingConfig) -> Self {
        Self {
            duration: Duration::from_secs(c.duration_secs),
            interval: Duration::from_secs(c.interval_secs),
            sample_log: c.sample_log.as_ref().map(PathBuf::from),
        }
    }
}

pub struct Sampler {
    probes: Arc<dyn NetworkProbes>,
    config: SamplerConfig,
    events: Option<broadcast::Sender<DiagnosisEvent>>,
}

impl Sampler {
    pub fn new(probes: Arc<dyn NetworkProbes>, config: SamplerConfig) -> Self {
        Self {
            probes,
            config,
            events: None,
        }
    }

    /// Publish a [`DiagnosisEvent::Sample`] for every collected sample.
    pub fn with_events(mut self, tx: broadcast::Sender<DiagnosisEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Cycles per window: ⌈duration / interval⌉.
    pub fn sample_count(&self) -> usize {
        let interval = self.config.interval.as_millis().max(1);
        self.config.duration.as_millis().div_ceil(interval) as usize
    }

    /// Runs one full window. Cycles are spaced `interval` apart; a cycle that overruns delays the next.
    #[instrument(skip(self), fields(samples = self.sample_count(), interval_ms = self.config.interval.as_millis() as u64))]
    pub async fn collect(&self) -> Vec<RawSample> {
        let total = self.sample_count();
        let mut samples = Vec::with_capacity(total);
        let mut log = match &self.config.sample_log {
            Some(path) => SampleLog::create(path.clone()).await,
            None => None,
        };

        let mut tick = interval(self.config.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for index in 0..total {
            tick.tick().await;
            let sample = self.sample_once().await;
            debug!(index, ?sample, "sample collected");

            if let Some(l) = log.as_mut()
                && let Err(e) = l.append(&sample).await
            {
                warn!(error = %e, path = %l.path.display(), operation = "sample_log", "sample log write failed; disabling for this run");
                log = None;
            }
            if let Some(tx) = &self.events {
                // No subscribers is fine
                let _ = tx.send(DiagnosisEvent::Sample {
                    index,
                    total,
                    sample: sample.clone(),
                });
            }
            samples.push(sample);
        }
        samples
    }

    /// One probe cycle. A down link short-circuits to the degraded sample without probing further.
    pub async fn sample_once(&self) -> RawSample {
        if !self.probes.link_up().await {
            warn!(operation = "link_state", "no interface up; recording degraded sample");
            return RawSample::link_down(self.probes.echo_count());
        }

        let echo = self.probes.echo().await;
        let dns = self.probes.dns().await;
        let bandwidth_pct = self.probes.bandwidth_pct().await;
        let signal_strength_dbm = self.probes.signal_strength_dbm().await;

        RawSample {
            latency_ms: echo.latency_ms,
            jitter_ms: echo.jitter_ms,
            packet_loss_pct: echo.packet_loss_pct,
            connected: true,
            dns_time_ms: dns.time_ms(),
            bandwidth_pct: bandwidth_pct.clamp(0.0, 100.0),
            signal_strength_dbm,
            connection_drops: echo.drops(),
            error_kind: classify_error(&echo, &dns),
        }
    }
}

/// Error category of one cycle: resolver refusal beats total loss beats slowness.
pub fn classify_error(echo: &EchoStats, dns: &DnsOutcome) -> ErrorKind {
    match dns {
        DnsOutcome::Failed => ErrorKind::Refused,
        DnsOutcome::TimedOut => ErrorKind::Timeout,
        DnsOutcome::Resolved { elapsed_ms } => {
            if echo.packet_loss_pct >= 100.0 {
                ErrorKind::Unreachable
            } else if echo.latency_ms > SLOW_RESPONSE_MS || *elapsed_ms > SLOW_RESPONSE_MS {
                ErrorKind::Timeout
            } else {
                ErrorKind::None
            }
        }
    }
}

/// `<local time> - <sample json>` lines, truncated at the start of every run.
struct SampleLog {
    path: PathBuf,
    file: tokio::fs::File,
}

impl SampleLog {
    async fn create(path: PathBuf) -> Option<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            warn!(error = %e, path = %path.display(), operation = "sample_log", "cannot create sample log directory");
            return None;
        }
        match tokio::fs::File::create(&path).await {
            Ok(file) => Some(Self { path, file }),
            Err(e) => {
                warn!(error = %e, path = %path.display(), operation = "sample_log", "cannot open sample log");
                None
            }
        }
    }

    async fn append(&mut self, sample: &RawSample) -> anyhow::Result<()> {
        let line = format!(
            "{} - {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            serde_json::to_string(sample)?
        );
        self.file.write_all(line.as_bytes()).await?;
        self.file.flush().await?;
        Ok(())
    }
}
