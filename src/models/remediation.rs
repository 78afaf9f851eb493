// Remediation state machine values and outcomes.

use serde::{Deserialize, Serialize};

use super::Label;

/// Per-label dispatcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemediationState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// What a step produced: free text, a structured list, or nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum StepOutput {
    Text(String),
    List(Vec<String>),
    None,
}

impl StepOutput {
    pub fn is_empty(&self) -> bool {
        match self {
            StepOutput::Text(s) => s.is_empty(),
            StepOutput::List(v) => v.is_empty(),
            StepOutput::None => true,
        }
    }
}

/// Raw result of running a step: exit status plus captured output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    /// Process exit code; `Some(0)` for in-process steps that completed.
    pub exit_code: Option<i32>,
    pub output: StepOutput,
    #[serde(default)]
    pub stderr: String,
}

impl StepReport {
    pub fn ok(output: StepOutput) -> Self {
        Self {
            exit_code: Some(0),
            output,
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// What `dispatch_remediation` hands back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RemediationOutcome {
    #[serde(rename_all = "camelCase")]
    Succeeded {
        label: Label,
        output: StepOutput,
        duration_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        label: Label,
        error: String,
        exit_code: Option<i32>,
        output: StepOutput,
        stderr: String,
        duration_ms: u64,
    },
    /// A step for this label is already running; nothing was executed.
    AlreadyRunning { label: Label },
}

impl RemediationOutcome {
    pub fn label(&self) -> Label {
        match self {
            RemediationOutcome::Succeeded { label, .. }
            | RemediationOutcome::Failed { label, .. }
            | RemediationOutcome::AlreadyRunning { label } => *label,
        }
    }

    /// Terminal state this outcome left the label in; `None` for a rejected request.
    pub fn state(&self) -> Option<RemediationState> {
        match self {
            RemediationOutcome::Succeeded { .. } => Some(RemediationState::Succeeded),
            RemediationOutcome::Failed { .. } => Some(RemediationState::Failed),
            RemediationOutcome::AlreadyRunning { .. } => None,
        }
    }
}
