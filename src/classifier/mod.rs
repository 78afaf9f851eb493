// Classifier: frozen model consumed at runtime, never trained here.

pub mod artifact;
pub mod forest;

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub use artifact::ModelBundle;

use crate::error::DiagnosisError;
use crate::features::{FeatureVector, FrozenSchema};
use crate::models::{Label, ModelInfo};

/// A label and the mean forest probability behind it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: Label,
    pub confidence: f64,
}

/// Shared handle to the loaded model (or to its absence). Cheap to clone.
#[derive(Debug, Clone)]
pub struct Classifier {
    bundle: Option<Arc<ModelBundle>>,
}

impl Classifier {
    pub fn new(bundle: ModelBundle) -> Self {
        Self {
            bundle: Some(Arc::new(bundle)),
        }
    }

    /// A classifier with no model; every prediction fails with `ModelUnavailable`.
    pub fn unloaded() -> Self {
        Self { bundle: None }
    }

    /// Loads the artifact pair. With `require` unset, missing files yield an unloaded
    /// classifier; a mismatched or broken pair is always an error.
    pub fn load(artifact: &Path, schema: &Path, require: bool) -> Result<Self, DiagnosisError> {
        match ModelBundle::load(artifact, schema) {
            Ok(bundle) => Ok(Self::new(bundle)),
            Err(e) if !require && e.is_missing_artifact() => {
                warn!(error = %e, operation = "model_load", "model artifact missing; diagnosis disabled");
                Ok(Self::unloaded())
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.bundle.is_some()
    }

    pub fn schema(&self) -> Result<&FrozenSchema, DiagnosisError> {
        Ok(self.bundle()?.schema())
    }

    pub fn model_id(&self) -> Result<&str, DiagnosisError> {
        Ok(self.bundle()?.model_id())
    }

    pub fn info(&self) -> Result<ModelInfo, DiagnosisError> {
        let b = self.bundle()?;
        Ok(ModelInfo {
            model_id: b.model_id().to_string(),
            schema_version: b.schema().version(),
            columns: b.schema().columns().to_vec(),
            classes: b.classes().to_vec(),
            tree_count: b.forest().tree_count(),
        })
    }

    /// Deterministic for a fixed artifact. The vector must have been encoded against this model's schema.
    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction, DiagnosisError> {
        let b = self.bundle()?;
        if !features.matches(b.schema()) {
            return Err(DiagnosisError::SchemaMismatch(format!(
                "feature vector has {} columns not encoded against schema of model {}",
                features.len(),
                b.model_id()
            )));
        }
        let proba = b.forest().predict_proba(features.values());
        let i = forest::argmax(&proba).ok_or_else(|| {
            DiagnosisError::InvalidArtifact("forest produced no class probabilities".into())
        })?;
        let prediction = Prediction {
            label: b.classes()[i],
            confidence: proba[i],
        };
        debug!(label = %prediction.label, confidence = prediction.confidence, "predicted");
        Ok(prediction)
    }

    fn bundle(&self) -> Result<&ModelBundle, DiagnosisError> {
        self.bundle
            .as_deref()
            .ok_or_else(|| DiagnosisError::ModelUnavailable("no model artifact loaded".into()))
    }
}
