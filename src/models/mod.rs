// Domain models

mod label;
mod remediation;
mod report;
mod sample;

pub use label::{Label, UnknownLabel};
pub use remediation::{RemediationOutcome, RemediationState, StepOutput, StepReport};
pub use report::{DiagnosisEvent, DiagnosisReport, ModelInfo};
pub use sample::{
    DEFAULT_DEGRADED_DROPS, ErrorKind, RawSample, SENTINEL_DBM, SENTINEL_MS, TOTAL_LOSS_PCT,
    WindowedObservation,
};
