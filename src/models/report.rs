// Diagnosis results and the events published while a run is in progress.

use serde::{Deserialize, Serialize};

use super::{Label, RawSample, WindowedObservation};
use crate::features::FeatureVector;

/// Result of one diagnostic run, handed to presentation collaborators.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisReport {
    pub label: Label,
    /// Mean forest probability of the winning label.
    pub confidence: f64,
    pub model_id: String,
    /// Run start, unix millis.
    pub started_at: u64,
    pub duration_ms: u64,
    pub observation: WindowedObservation,
    pub features: FeatureVector,
    pub samples: Vec<RawSample>,
}

/// Published on the event channel (`/ws/diagnosis`).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DiagnosisEvent {
    /// One probe cycle finished.
    Sample {
        index: usize,
        total: usize,
        sample: RawSample,
    },
    /// A run finished and was classified.
    Completed { report: Box<DiagnosisReport> },
}

/// Summary of the loaded model for `GET /api/model`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub model_id: String,
    pub schema_version: u32,
    pub columns: Vec<String>,
    pub classes: Vec<Label>,
    pub tree_count: usize,
}
