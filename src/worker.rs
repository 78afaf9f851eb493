// Background auto-diagnosis worker: one run every `auto_diagnose_interval_secs` until shutdown.
// Reports go out on the event channel through the service; the worker only logs.

use crate::error::DiagnosisError;
use crate::pipeline::SharedService;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::Instrument;

/// Service and shutdown for the worker.
pub struct WorkerDeps {
    pub service: SharedService,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

pub struct WorkerConfig {
    pub interval_secs: u64,
}

/// Spawns the worker. The first run starts immediately; a run in progress is abandoned on shutdown.
pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        service,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig { interval_secs } = config;

    let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", interval_secs);
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(interval_secs.max(1)));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut runs_total: u64 = 0;
        let mut failures_total: u64 = 0;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    tokio::select! {
                        result = service.run_diagnosis() => {
                            runs_total += 1;
                            match result {
                                Ok(report) => tracing::info!(
                                    operation = "auto_diagnosis",
                                    label = %report.label,
                                    confidence = report.confidence,
                                    runs_total,
                                    "auto diagnosis finished"
                                ),
                                Err(DiagnosisError::ModelUnavailable(reason)) => {
                                    failures_total += 1;
                                    tracing::debug!(operation = "auto_diagnosis", %reason, "skipped: no model");
                                }
                                Err(e) => {
                                    failures_total += 1;
                                    tracing::warn!(
                                        error = %e,
                                        operation = "auto_diagnosis",
                                        failures_total,
                                        "auto diagnosis failed"
                                    );
                                }
                            }
                        }
                        _ = &mut shutdown_rx => {
                            tracing::debug!("Worker shutting down mid-run");
                            break;
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
            }
        }
        tracing::debug!(runs_total, failures_total, "Worker stopped");
    }
    .instrument(worker_span))
}
