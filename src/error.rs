// Error taxonomy for the diagnosis pipeline and remediation.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::models::StepOutput;

/// Failures that stop a diagnosis from producing a label.
#[derive(Debug, Error)]
pub enum DiagnosisError {
    /// No model artifact is loaded; never answered with a default label.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Artifact and schema do not come from the same training run.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("failed to read {path}: {source}")]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    ArtifactParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DiagnosisError {
    /// True when the artifact pair is simply absent (as opposed to present but broken).
    pub fn is_missing_artifact(&self) -> bool {
        matches!(
            self,
            DiagnosisError::ArtifactIo { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

/// Probe-local failure; converted to a sentinel value at the probe boundary.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("probe failed: {0}")]
    Failed(String),
}

/// Remediation step execution failure. Rendered into a failed outcome with captured output.
#[derive(Debug, Error)]
pub enum RemediationError {
    /// Carries whatever the step wrote before it was stopped.
    #[error("step timed out after {after:?}")]
    Timeout {
        after: Duration,
        output: StepOutput,
        stderr: String,
    },

    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {code:?}")]
    NonZeroExit { command: String, code: Option<i32> },

    #[error("step task failed: {0}")]
    Join(String),

    #[error("no remediation step registered for {0}")]
    Unregistered(String),

    #[error("measurement failed: {0}")]
    Probe(#[from] ProbeError),
}

impl RemediationError {
    /// Timeout with nothing captured.
    pub fn timed_out(after: Duration) -> Self {
        RemediationError::Timeout {
            after,
            output: StepOutput::None,
            stderr: String::new(),
        }
    }

    /// Output captured before the failure, if the step got that far.
    pub fn into_partial_output(self) -> (StepOutput, String) {
        match self {
            RemediationError::Timeout { output, stderr, .. } => (output, stderr),
            _ => (StepOutput::None, String::new()),
        }
    }
}
