// One diagnostic run end to end, plus remediation dispatch.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tracing::{info, instrument};

use crate::aggregator;
use crate::classifier::Classifier;
use crate::error::DiagnosisError;
use crate::features;
use crate::models::{DiagnosisEvent, DiagnosisReport, Label, RemediationOutcome};
use crate::remediation::Dispatcher;
use crate::sampler::Sampler;

/// Stateless between runs; concurrent `run_diagnosis` calls are independent.
pub struct DiagnosisService {
    sampler: Sampler,
    classifier: Classifier,
    dispatcher: Dispatcher,
    events: Option<broadcast::Sender<DiagnosisEvent>>,
}

impl DiagnosisService {
    pub fn new(sampler: Sampler, classifier: Classifier, dispatcher: Dispatcher) -> Self {
        Self {
            sampler,
            classifier,
            dispatcher,
            events: None,
        }
    }

    /// Publish sample progress and finished reports on `tx`.
    pub fn with_events(mut self, tx: broadcast::Sender<DiagnosisEvent>) -> Self {
        self.sampler = self.sampler.with_events(tx.clone());
        self.events = Some(tx);
        self
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Samples one window, then aggregates, encodes and classifies it.
    /// Fails before sampling when no model is loaded.
    #[instrument(skip(self), fields(operation = "run_diagnosis"))]
    pub async fn run_diagnosis(&self) -> Result<DiagnosisReport, DiagnosisError> {
        let schema = self.classifier.schema()?;
        let started_at = unix_millis();
        let started = Instant::now();

        let samples = self.sampler.collect().await;
        let observation = aggregator::aggregate(&samples);
        let features = features::encode(&observation, schema);
        let prediction = self.classifier.predict(&features)?;

        let report = DiagnosisReport {
            label: prediction.label,
            confidence: prediction.confidence,
            model_id: self.classifier.model_id()?.to_string(),
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
            observation,
            features,
            samples,
        };
        info!(
            label = %report.label,
            confidence = report.confidence,
            samples = report.samples.len(),
            duration_ms = report.duration_ms,
            "diagnosis completed"
        );
        if let Some(tx) = &self.events {
            let _ = tx.send(DiagnosisEvent::Completed {
                report: Box::new(report.clone()),
            });
        }
        Ok(report)
    }

    pub async fn dispatch_remediation(&self, label: Label) -> RemediationOutcome {
        self.dispatcher.dispatch(label).await
    }
}

/// Shared handle used by the HTTP layer and the background worker.
pub type SharedService = Arc<DiagnosisService>;

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
