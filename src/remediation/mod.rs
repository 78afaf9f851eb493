// Remediation dispatch: per-label, non-reentrant, bounded execution of catalogue steps.

pub mod actions;
pub mod steps;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

pub use actions::{RemediationAction, action_for, catalogue};

use crate::config::RemediationConfig;
use crate::error::RemediationError;
use crate::models::{Label, RemediationOutcome, RemediationState, StepOutput, StepReport};

/// Executable part of a remediation action.
#[async_trait]
pub trait RemediationStep: Send + Sync {
    /// Runs the step, giving up after `timeout`. A finished process with a non-zero exit
    /// is still `Ok`; the dispatcher decides what counts as success.
    async fn execute(&self, timeout: Duration) -> Result<StepReport, RemediationError>;

    /// Shown in failure messages.
    fn describe(&self) -> String {
        "remediation step".to_string()
    }
}

/// Extra time a step gets to stop itself and hand back partial output before it is dropped.
const STEP_GRACE: Duration = Duration::from_secs(1);

type StateMap = Arc<Mutex<HashMap<Label, RemediationState>>>;

/// Cheap to clone; clones share label states.
#[derive(Clone)]
pub struct Dispatcher {
    steps: Arc<HashMap<Label, Arc<dyn RemediationStep>>>,
    states: StateMap,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(config: &RemediationConfig) -> Self {
        Self::with_steps(
            actions::default_steps(config),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Dispatcher over an explicit step set (tests substitute fakes here).
    pub fn with_steps(steps: HashMap<Label, Arc<dyn RemediationStep>>, timeout: Duration) -> Self {
        Self {
            steps: Arc::new(steps),
            states: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    pub fn state(&self, label: Label) -> RemediationState {
        lock(&self.states).get(&label).copied().unwrap_or_default()
    }

    pub fn states(&self) -> Vec<(Label, RemediationState)> {
        let states = lock(&self.states);
        Label::ALL
            .into_iter()
            .map(|l| (l, states.get(&l).copied().unwrap_or_default()))
            .collect()
    }

    /// Runs the action for `label` unless one is already running for it.
    /// Never retried; a failure comes back with whatever output the step captured.
    #[instrument(skip(self), fields(label = %label))]
    pub async fn dispatch(&self, label: Label) -> RemediationOutcome {
        let started = Instant::now();

        if label == Label::Normal {
            lock(&self.states).insert(label, RemediationState::Succeeded);
            return RemediationOutcome::Succeeded {
                label,
                output: StepOutput::None,
                duration_ms: 0,
            };
        }

        let Some(mut guard) = RunningGuard::acquire(&self.states, label) else {
            info!(operation = "dispatch_remediation", "remediation already running");
            return RemediationOutcome::AlreadyRunning { label };
        };

        let step = self.steps.get(&label);
        let result = match step {
            Some(step) => match tokio::time::timeout(self.timeout + STEP_GRACE, step.execute(self.timeout)).await {
                Ok(r) => r,
                Err(_) => Err(RemediationError::timed_out(self.timeout)),
            },
            None => Err(RemediationError::Unregistered(label.to_string())),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(report) if report.success() => RemediationOutcome::Succeeded {
                label,
                output: report.output,
                duration_ms,
            },
            Ok(report) => {
                let error = RemediationError::NonZeroExit {
                    command: step.map(|s| s.describe()).unwrap_or_default(),
                    code: report.exit_code,
                };
                RemediationOutcome::Failed {
                    label,
                    error: error.to_string(),
                    exit_code: report.exit_code,
                    output: report.output,
                    stderr: report.stderr,
                    duration_ms,
                }
            }
            Err(e) => {
                let error = e.to_string();
                let (output, stderr) = e.into_partial_output();
                RemediationOutcome::Failed {
                    label,
                    error,
                    exit_code: None,
                    output,
                    stderr,
                    duration_ms,
                }
            }
        };

        match &outcome {
            RemediationOutcome::Failed { error, .. } => {
                warn!(operation = "dispatch_remediation", error = %error, duration_ms, "remediation failed")
            }
            _ => info!(operation = "dispatch_remediation", duration_ms, "remediation succeeded"),
        }
        if let Some(state) = outcome.state() {
            guard.finish(state);
        }
        outcome
    }
}

fn lock(states: &StateMap) -> std::sync::MutexGuard<'_, HashMap<Label, RemediationState>> {
    states.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds a label in `Running`. Dropped without `finish` (cancelled request), it returns the label to `Idle`.
struct RunningGuard {
    states: StateMap,
    label: Label,
    terminal: Option<RemediationState>,
}

impl RunningGuard {
    fn acquire(states: &StateMap, label: Label) -> Option<Self> {
        let mut map = lock(states);
        if map.get(&label) == Some(&RemediationState::Running) {
            return None;
        }
        map.insert(label, RemediationState::Running);
        Some(Self {
            states: Arc::clone(states),
            label,
            terminal: None,
        })
    }

    fn finish(&mut self, state: RemediationState) {
        self.terminal = Some(state);
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        let state = self.terminal.unwrap_or(RemediationState::Idle);
        lock(&self.states).insert(self.label, state);
    }
}
