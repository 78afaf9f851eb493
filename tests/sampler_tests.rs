// Sampler tests: cadence, link-down short-circuit, error classification, sample log

mod common;

use common::{FakeCycle, FakeProbes, fast_sampler};
use netdiag::models::{DiagnosisEvent, ErrorKind, RawSample};
use netdiag::probes::{DnsOutcome, EchoStats};
use netdiag::sampler::{Sampler, SamplerConfig, classify_error};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::broadcast;

fn echo(latency_ms: f64, packet_loss_pct: f64) -> EchoStats {
    EchoStats {
        latency_ms,
        jitter_ms: 1.0,
        packet_loss_pct,
        sent: 5,
        received: 5,
    }
}

#[test]
fn test_sample_count_is_ceil_of_duration_over_interval() {
    let probes = Arc::new(FakeProbes::new(vec![FakeCycle::healthy()]));
    let count = |duration: u64, interval: u64| {
        Sampler::new(
            probes.clone(),
            SamplerConfig {
                duration: Duration::from_secs(duration),
                interval: Duration::from_secs(interval),
                sample_log: None,
            },
        )
        .sample_count()
    };
    assert_eq!(count(20, 4), 5);
    assert_eq!(count(21, 4), 6);
    assert_eq!(count(4, 4), 1);
    assert_eq!(count(10, 3), 4);
}

#[tokio::test]
async fn test_collect_returns_one_sample_per_cycle() {
    let probes = Arc::new(FakeProbes::new(vec![FakeCycle::healthy()]));
    let samples = fast_sampler(probes.clone(), 4).collect().await;
    assert_eq!(samples.len(), 4);
    assert_eq!(probes.echo_calls.load(Ordering::SeqCst), 4);
    for s in &samples {
        assert!(s.connected);
        assert_eq!(s.latency_ms, 20.0);
        assert_eq!(s.error_kind, ErrorKind::None);
        assert_eq!(s.connection_drops, 0);
    }
}

#[tokio::test]
async fn test_link_down_cycle_skips_other_probes() {
    let probes = Arc::new(FakeProbes::new(vec![
        FakeCycle::healthy(),
        FakeCycle::Down,
        FakeCycle::healthy(),
    ]));
    let samples = fast_sampler(probes.clone(), 3).collect().await;
    assert_eq!(samples.len(), 3);
    assert_eq!(probes.echo_calls.load(Ordering::SeqCst), 2);
    assert_eq!(samples[1], RawSample::link_down(5));
    assert!(!samples[1].connected);
    assert_eq!(samples[1].error_kind, ErrorKind::Unreachable);
    assert_eq!(samples[1].signal_strength_dbm, -999.0);
}

#[tokio::test]
async fn test_refused_dns_cycle_is_classified() {
    let probes = Arc::new(FakeProbes::new(vec![FakeCycle::dns_refused()]));
    let samples = fast_sampler(probes, 1).collect().await;
    assert_eq!(samples[0].error_kind, ErrorKind::Refused);
    assert_eq!(samples[0].dns_time_ms, 999.0);
    assert_eq!(samples[0].connection_drops, 4);
}

#[tokio::test]
async fn test_samples_are_published_with_progress() {
    let probes = Arc::new(FakeProbes::new(vec![FakeCycle::healthy()]));
    let (tx, mut rx) = broadcast::channel(16);
    let samples = fast_sampler(probes, 3).with_events(tx).collect().await;
    for expected in 0..3 {
        match rx.recv().await.unwrap() {
            DiagnosisEvent::Sample {
                index,
                total,
                sample,
            } => {
                assert_eq!(index, expected);
                assert_eq!(total, 3);
                assert_eq!(sample, samples[expected]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_sample_log_is_truncated_per_run() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("logs").join("network_log.txt");
    let probes = Arc::new(FakeProbes::new(vec![FakeCycle::healthy()]));
    let sampler = Sampler::new(
        probes,
        SamplerConfig {
            duration: Duration::from_millis(15),
            interval: Duration::from_millis(5),
            sample_log: Some(path.clone()),
        },
    );

    sampler.collect().await;
    sampler.collect().await;

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in lines {
        let (_ts, json) = line.split_once(" - ").expect("timestamp separator");
        let s: RawSample = serde_json::from_str(json).unwrap();
        assert_eq!(s.latency_ms, 20.0);
    }
}

#[test]
fn test_classify_error_rules() {
    let ok = DnsOutcome::Resolved { elapsed_ms: 20.0 };
    assert_eq!(classify_error(&echo(20.0, 0.0), &ok), ErrorKind::None);
    assert_eq!(
        classify_error(&echo(20.0, 0.0), &DnsOutcome::Failed),
        ErrorKind::Refused
    );
    assert_eq!(
        classify_error(&echo(20.0, 0.0), &DnsOutcome::TimedOut),
        ErrorKind::Timeout
    );
    assert_eq!(classify_error(&echo(999.0, 100.0), &ok), ErrorKind::Unreachable);
    assert_eq!(classify_error(&echo(250.0, 0.0), &ok), ErrorKind::Timeout);
    assert_eq!(
        classify_error(&echo(20.0, 0.0), &DnsOutcome::Resolved { elapsed_ms: 350.0 }),
        ErrorKind::Timeout
    );
    assert_eq!(classify_error(&echo(200.0, 40.0), &ok), ErrorKind::None);
}
