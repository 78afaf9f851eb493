// End-to-end diagnosis tests over scripted probes and the shipped model

mod common;

use common::{FakeCycle, FakeProbes, FakeStep, fast_sampler, shipped_classifier};
use netdiag::classifier::Classifier;
use netdiag::error::DiagnosisError;
use netdiag::models::{DiagnosisEvent, ErrorKind, Label, RemediationOutcome};
use netdiag::pipeline::DiagnosisService;
use netdiag::remediation::{Dispatcher, RemediationStep};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::broadcast;

fn service(cycles: Vec<FakeCycle>, samples: u64, classifier: Classifier) -> (DiagnosisService, Arc<FakeProbes>) {
    let probes = Arc::new(FakeProbes::new(cycles));
    let dispatcher = Dispatcher::with_steps(HashMap::new(), Duration::from_secs(1));
    let svc = DiagnosisService::new(fast_sampler(probes.clone(), samples), classifier, dispatcher);
    (svc, probes)
}

#[tokio::test]
async fn test_healthy_window_is_normal() {
    let (svc, _) = service(vec![FakeCycle::healthy()], 5, shipped_classifier());
    let report = svc.run_diagnosis().await.unwrap();
    assert_eq!(report.label, Label::Normal);
    assert!((report.confidence - 0.95).abs() < 1e-3);
    assert_eq!(report.model_id, "netdiag-rf-2025.03.1");
    assert_eq!(report.samples.len(), 5);
    assert_eq!(report.observation.sample_count, 5);
    assert!(report.observation.connected);
    assert_eq!(report.features.len(), 12);
    assert_eq!(report.features.get("err_none"), Some(1.0));
}

#[tokio::test]
async fn test_link_down_window_is_degraded_label() {
    let (svc, probes) = service(vec![FakeCycle::Down], 5, shipped_classifier());
    let report = svc.run_diagnosis().await.unwrap();
    assert!(report.label.is_link_degraded(), "{}", report.label);
    assert_ne!(report.label, Label::Normal);
    assert!(!report.observation.connected);
    assert_eq!(report.observation.error_kind, ErrorKind::Unreachable);
    assert_eq!(probes.echo_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_one_refused_cycle_makes_window_refused() {
    let cycles = vec![
        FakeCycle::healthy(),
        FakeCycle::healthy(),
        FakeCycle::dns_refused(),
        FakeCycle::healthy(),
        FakeCycle::healthy(),
    ];
    let (svc, _) = service(cycles, 5, shipped_classifier());
    let report = svc.run_diagnosis().await.unwrap();
    assert_eq!(report.observation.error_kind, ErrorKind::Refused);
    assert_eq!(report.features.get("err_refused"), Some(1.0));
    assert_eq!(report.features.get("err_none"), Some(0.0));
}

#[tokio::test]
async fn test_unloaded_model_fails_before_sampling() {
    let (svc, probes) = service(vec![FakeCycle::healthy()], 5, Classifier::unloaded());
    let err = svc.run_diagnosis().await.unwrap_err();
    assert!(matches!(err, DiagnosisError::ModelUnavailable(_)));
    assert_eq!(probes.echo_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_completed_event_carries_report() {
    let (svc, _) = service(vec![FakeCycle::healthy()], 2, shipped_classifier());
    let (tx, mut rx) = broadcast::channel(16);
    let svc = svc.with_events(tx);
    let report = svc.run_diagnosis().await.unwrap();

    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], DiagnosisEvent::Sample { index: 0, .. }));
    assert!(matches!(events[1], DiagnosisEvent::Sample { index: 1, .. }));
    match &events[2] {
        DiagnosisEvent::Completed { report: r } => {
            assert_eq!(r.label, report.label);
            assert_eq!(r.started_at, report.started_at);
        }
        other => panic!("expected Completed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let (svc, _) = service(vec![FakeCycle::healthy()], 3, shipped_classifier());
    let (a, b) = tokio::join!(svc.run_diagnosis(), svc.run_diagnosis());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.samples.len(), 3);
    assert_eq!(b.samples.len(), 3);
    assert_eq!(a.label, b.label);
}

#[tokio::test]
async fn test_diagnose_then_remediate_predicted_label() {
    let probes = Arc::new(FakeProbes::new(vec![FakeCycle::dns_refused()]));
    let step = Arc::new(FakeStep::ok("cache flushed"));
    let mut steps: HashMap<Label, Arc<dyn RemediationStep>> = HashMap::new();
    steps.insert(Label::DnsFailure, step.clone());
    let svc = DiagnosisService::new(
        fast_sampler(probes, 3),
        shipped_classifier(),
        Dispatcher::with_steps(steps, Duration::from_secs(1)),
    );

    let report = svc.run_diagnosis().await.unwrap();
    assert_eq!(report.label, Label::DnsFailure);
    let outcome = svc.dispatch_remediation(report.label).await;
    assert!(matches!(outcome, RemediationOutcome::Succeeded { .. }));
    assert_eq!(step.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_report_serializes_camel_case() {
    let (svc, _) = service(vec![FakeCycle::healthy()], 1, shipped_classifier());
    let report = svc.run_diagnosis().await.unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["label"], "Normal");
    assert_eq!(json["modelId"], "netdiag-rf-2025.03.1");
    assert_eq!(json["observation"]["errorKind"], "none");
    assert_eq!(json["features"]["latency"], 20.0);
    assert_eq!(json["samples"][0]["latencyMs"], 20.0);
}
