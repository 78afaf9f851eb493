// Shared test helpers: scripted probes and steps, sample builders, the shipped model.
#![allow(dead_code)]

use async_trait::async_trait;
use netdiag::classifier::{Classifier, ModelBundle};
use netdiag::error::RemediationError;
use netdiag::models::*;
use netdiag::probes::{DnsOutcome, EchoStats, NetworkProbes};
use netdiag::remediation::RemediationStep;
use netdiag::sampler::{Sampler, SamplerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn models_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models")
}

pub fn artifact_path() -> PathBuf {
    models_dir().join("network_model.json")
}

pub fn schema_path() -> PathBuf {
    models_dir().join("network_schema.json")
}

pub fn load_bundle() -> ModelBundle {
    ModelBundle::load(&artifact_path(), &schema_path()).expect("shipped model loads")
}

pub fn shipped_classifier() -> Classifier {
    Classifier::new(load_bundle())
}

/// One scripted probe cycle.
#[derive(Debug, Clone)]
pub enum FakeCycle {
    Down,
    Up {
        echo: EchoStats,
        dns: DnsOutcome,
        bandwidth_pct: f64,
        signal_dbm: f64,
    },
}

impl FakeCycle {
    /// Fast, clean link.
    pub fn healthy() -> Self {
        FakeCycle::Up {
            echo: EchoStats {
                latency_ms: 20.0,
                jitter_ms: 3.0,
                packet_loss_pct: 0.0,
                sent: 5,
                received: 5,
            },
            dns: DnsOutcome::Resolved { elapsed_ms: 20.0 },
            bandwidth_pct: 10.0,
            signal_dbm: -50.0,
        }
    }

    /// Link up but the resolver refuses.
    pub fn dns_refused() -> Self {
        FakeCycle::Up {
            echo: EchoStats {
                latency_ms: 700.0,
                jitter_ms: 400.0,
                packet_loss_pct: 80.0,
                sent: 5,
                received: 1,
            },
            dns: DnsOutcome::Failed,
            bandwidth_pct: 40.0,
            signal_dbm: -60.0,
        }
    }
}

/// Replays `cycles` in order (wrapping), one per `link_up` call.
pub struct FakeProbes {
    cycles: Vec<FakeCycle>,
    next: AtomicUsize,
    current: Mutex<usize>,
    pub echo_calls: AtomicUsize,
    pub echo_count: u32,
}

impl FakeProbes {
    pub fn new(cycles: Vec<FakeCycle>) -> Self {
        assert!(!cycles.is_empty());
        Self {
            cycles,
            next: AtomicUsize::new(0),
            current: Mutex::new(0),
            echo_calls: AtomicUsize::new(0),
            echo_count: 5,
        }
    }

    fn cycle(&self) -> FakeCycle {
        self.cycles[*self.current.lock().unwrap()].clone()
    }

    fn up(&self) -> (EchoStats, DnsOutcome, f64, f64) {
        match self.cycle() {
            FakeCycle::Up {
                echo,
                dns,
                bandwidth_pct,
                signal_dbm,
            } => (echo, dns, bandwidth_pct, signal_dbm),
            FakeCycle::Down => panic!("probe called on a link-down cycle"),
        }
    }
}

#[async_trait]
impl NetworkProbes for FakeProbes {
    async fn link_up(&self) -> bool {
        let i = self.next.fetch_add(1, Ordering::SeqCst) % self.cycles.len();
        *self.current.lock().unwrap() = i;
        matches!(self.cycles[i], FakeCycle::Up { .. })
    }

    async fn echo(&self) -> EchoStats {
        self.echo_calls.fetch_add(1, Ordering::SeqCst);
        self.up().0
    }

    async fn dns(&self) -> DnsOutcome {
        self.up().1
    }

    async fn bandwidth_pct(&self) -> f64 {
        self.up().2
    }

    async fn signal_strength_dbm(&self) -> f64 {
        self.up().3
    }

    fn echo_count(&self) -> u32 {
        self.echo_count
    }
}

/// Sampler over fake probes with a millisecond cadence.
pub fn fast_sampler(probes: Arc<FakeProbes>, samples: u64) -> Sampler {
    Sampler::new(
        probes,
        SamplerConfig {
            duration: Duration::from_millis(samples * 5),
            interval: Duration::from_millis(5),
            sample_log: None,
        },
    )
}

/// Remediation step that sleeps, then returns a fixed report.
pub struct FakeStep {
    pub delay: Duration,
    pub result: Result<StepReport, String>,
    pub calls: AtomicUsize,
}

impl FakeStep {
    pub fn ok(text: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(StepReport::ok(StepOutput::Text(text.into()))),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn exit(code: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(StepReport {
                exit_code: Some(code),
                output: StepOutput::Text(stdout.into()),
                stderr: stderr.into(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::ok("done")
        }
    }
}

#[async_trait]
impl RemediationStep for FakeStep {
    async fn execute(&self, _timeout: Duration) -> Result<StepReport, RemediationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.result.clone().map_err(RemediationError::Join)
    }
}

pub fn sample(latency_ms: f64, packet_loss_pct: f64, error_kind: ErrorKind) -> RawSample {
    RawSample {
        latency_ms,
        jitter_ms: 3.0,
        packet_loss_pct,
        connected: true,
        dns_time_ms: 20.0,
        bandwidth_pct: 10.0,
        signal_strength_dbm: -50.0,
        connection_drops: 0,
        error_kind,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn observation(
    latency_ms: f64,
    packet_loss_pct: f64,
    connected: bool,
    jitter_ms: f64,
    bandwidth_pct: f64,
    signal_strength_dbm: f64,
    dns_time_ms: f64,
    connection_drops: u32,
    error_kind: ErrorKind,
) -> WindowedObservation {
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
        sample_count: 5,
    }
}
