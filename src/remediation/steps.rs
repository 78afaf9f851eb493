// Concrete remediation steps: external commands and in-process host inspections.

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use sysinfo::{Networks, ProcessesToUpdate, System};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, instrument};

use super::RemediationStep;
use crate::error::RemediationError;
use crate::models::{StepOutput, StepReport};
use crate::probes::{bandwidth, linux};

/// Runs an external program and captures its output.
#[derive(Debug, Clone)]
pub struct CommandStep {
    program: String,
    args: Vec<String>,
}

impl CommandStep {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `program arg1 arg2`, for logs and error messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl RemediationStep for CommandStep {
    #[instrument(skip(self), fields(command = %self.command_line()))]
    async fn execute(&self, timeout: Duration) -> Result<StepReport, RemediationError> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RemediationError::Spawn {
                command: self.command_line(),
                source,
            })?;

        let stdout = Captured::default();
        let stderr = Captured::default();
        let mut readers = [
            tokio::spawn(drain(child.stdout.take(), stdout.clone())),
            tokio::spawn(drain(child.stderr.take(), stderr.clone())),
        ];

        let status = tokio::time::timeout(timeout, child.wait()).await;
        if status.is_err() {
            let _ = child.start_kill();
        }
        // Grandchildren may keep the pipes open after the direct child exits.
        let _ = tokio::time::timeout(DRAIN_GRACE, async {
            for reader in readers.iter_mut() {
                let _ = reader.await;
            }
        })
        .await;
        for reader in &readers {
            reader.abort();
        }

        match status {
            Ok(Ok(status)) => {
                debug!(code = ?status.code(), "command finished");
                Ok(StepReport {
                    exit_code: status.code(),
                    output: StepOutput::Text(stdout.text()),
                    stderr: stderr.text(),
                })
            }
            Ok(Err(e)) => Err(RemediationError::Join(format!("wait for `{}`: {}", self.command_line(), e))),
            Err(_) => {
                debug!(?timeout, "command timed out, returning partial output");
                Err(RemediationError::Timeout {
                    after: timeout,
                    output: StepOutput::Text(stdout.text()),
                    stderr: stderr.text(),
                })
            }
        }
    }

    fn describe(&self) -> String {
        self.command_line()
    }
}

/// How long to keep reading after the process exits or is killed.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Output collected so far; readable while the reader task is still running.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, into: Captured) {
    let Some(mut pipe) = pipe else { return };
    let mut chunk = [0u8; 4096];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => into
                .0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(&chunk[..n]),
        }
    }
}

/// Prints operator advice; nothing on the host is touched.
#[derive(Debug, Clone)]
pub struct Advisory {
    pub text: &'static str,
}

#[async_trait]
impl RemediationStep for Advisory {
    async fn execute(&self, _timeout: Duration) -> Result<StepReport, RemediationError> {
        Ok(StepReport::ok(StepOutput::Text(self.text.to_string())))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NoOp;

#[async_trait]
impl RemediationStep for NoOp {
    async fn execute(&self, _timeout: Duration) -> Result<StepReport, RemediationError> {
        Ok(StepReport::ok(StepOutput::None))
    }
}

/// Measures total throughput over `window` and flags it above `warn_mbps`.
#[derive(Debug, Clone)]
pub struct NetworkLoad {
    pub window: Duration,
    pub warn_mbps: f64,
}

#[async_trait]
impl RemediationStep for NetworkLoad {
    async fn execute(&self, timeout: Duration) -> Result<StepReport, RemediationError> {
        let bps = match tokio::time::timeout(timeout, bandwidth::measure_bits_per_sec(self.window)).await {
            Ok(Ok(bps)) => bps,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(RemediationError::timed_out(timeout)),
        };
        let mbps = bandwidth::to_mbps(bps);
        let mut lines = vec![format!("Usage: {:.2} Mbps", mbps)];
        if mbps > self.warn_mbps {
            lines.push("High load. Close bandwidth-heavy applications.".to_string());
        }
        Ok(StepReport::ok(StepOutput::Text(lines.join("\n"))))
    }
}

/// Lists up to `limit` processes holding network sockets, lowest pid first.
#[derive(Debug, Clone)]
pub struct SocketProcesses {
    pub limit: usize,
}

#[async_trait]
impl RemediationStep for SocketProcesses {
    async fn execute(&self, timeout: Duration) -> Result<StepReport, RemediationError> {
        let limit = self.limit;
        let task = tokio::task::spawn_blocking(move || {
            let mut sys = System::new();
            sys.refresh_processes(ProcessesToUpdate::All, true);
            let mut procs: Vec<_> = sys
                .processes()
                .iter()
                .map(|(pid, p)| (pid.as_u32(), p.name().to_string_lossy().into_owned()))
                .collect();
            procs.sort_by_key(|(pid, _)| *pid);
            procs
                .into_iter()
                .filter(|(pid, _)| linux::pid_has_socket(*pid))
                .take(limit)
                .map(|(pid, name)| format!("PID: {}, Name: {}", pid, name))
                .collect::<Vec<_>>()
        });
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(list)) => Ok(StepReport::ok(StepOutput::List(list))),
            Ok(Err(e)) => Err(RemediationError::Join(e.to_string())),
            Err(_) => Err(RemediationError::timed_out(timeout)),
        }
    }
}

/// Every adapter with its up state and link speed.
#[derive(Debug, Clone, Copy)]
pub struct AdapterList;

pub const NO_ACTIVE_ADAPTER: &str = "No active network adapters detected. Turn on your network connection.";

#[async_trait]
impl RemediationStep for AdapterList {
    async fn execute(&self, timeout: Duration) -> Result<StepReport, RemediationError> {
        let task = tokio::task::spawn_blocking(|| {
            let adapters = adapter_states();
            let any_up = adapters.iter().any(|(_, up, _)| *up);
            let mut lines: Vec<String> = adapters
                .into_iter()
                .map(|(name, up, speed)| format!("{}: Up={}, Speed={} Mbps", name, up, speed))
                .collect();
            if !any_up {
                lines.push(NO_ACTIVE_ADAPTER.to_string());
            }
            lines
        });
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(lines)) => Ok(StepReport::ok(StepOutput::List(lines))),
            Ok(Err(e)) => Err(RemediationError::Join(e.to_string())),
            Err(_) => Err(RemediationError::timed_out(timeout)),
        }
    }
}

/// (name, up, speed Mbps), sorted by name.
fn adapter_states() -> Vec<(String, bool, u64)> {
    if let Some(states) = linux::interface_link_states() {
        return states
            .into_iter()
            .map(|(name, up)| {
                let speed = linux::interface_speed_mbps(&name);
                (name, up, speed)
            })
            .collect();
    }
    let networks = Networks::new_with_refreshed_list();
    let mut out: Vec<(String, bool, u64)> = networks
        .list()
        .iter()
        .map(|(name, data)| {
            let up = data
                .ip_networks()
                .iter()
                .any(|n| !n.addr.is_loopback() && !n.addr.is_unspecified());
            (name.clone(), up, linux::interface_speed_mbps(name))
        })
        .collect();
    out.sort();
    out
}
