use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub probes: ProbeConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub remediation: RemediationConfig,
    pub publishing: PublishingConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    pub duration_secs: u64,
    pub interval_secs: u64,
    /// When set, each run rewrites this file with one line per sample.
    #[serde(default)]
    pub sample_log: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub echo_target: String,
    pub echo_count: u32,
    pub echo_timeout_ms: u64,
    pub echo_gap_ms: u64,
    pub dns_host: String,
    pub dns_timeout_ms: u64,
    pub bandwidth_interval_ms: u64,
    /// Reference link speed the bandwidth percentage is normalized against.
    pub reference_link_mbps: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            echo_target: "8.8.8.8".into(),
            echo_count: 5,
            echo_timeout_ms: 1000,
            echo_gap_ms: 100,
            dns_host: "google.com".into(),
            dns_timeout_ms: 2000,
            bandwidth_interval_ms: 1000,
            reference_link_mbps: 100,
        }
    }
}

impl ProbeConfig {
    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }

    pub fn echo_gap(&self) -> Duration {
        Duration::from_millis(self.echo_gap_ms)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    pub fn bandwidth_interval(&self) -> Duration {
        Duration::from_millis(self.bandwidth_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub artifact_path: String,
    pub schema_path: String,
    /// Refuse to start when the artifact pair is missing. A mismatched pair is always fatal.
    #[serde(default = "default_require_on_startup")]
    pub require_on_startup: bool,
}

fn default_require_on_startup() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemediationConfig {
    pub timeout_secs: u64,
    pub ping_target: String,
    pub ping_count: u32,
    pub trace_target: String,
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            ping_target: "8.8.8.8".into(),
            ping_count: 10,
            trace_target: "8.8.8.8".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max number of diagnosis events kept in the broadcast channel for /ws/diagnosis.
    pub broadcast_capacity: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Run a background diagnosis this often; 0 disables the worker.
    pub auto_diagnose_interval_secs: u64,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.sampling.interval_secs > 0,
            "sampling.interval_secs must be > 0, got {}",
            self.sampling.interval_secs
        );
        anyhow::ensure!(
            self.sampling.duration_secs >= self.sampling.interval_secs,
            "sampling.duration_secs must be >= sampling.interval_secs, got {} < {}",
            self.sampling.duration_secs,
            self.sampling.interval_secs
        );
        anyhow::ensure!(
            !self.probes.echo_target.is_empty(),
            "probes.echo_target must be non-empty"
        );
        anyhow::ensure!(
            self.probes.echo_count > 0,
            "probes.echo_count must be > 0, got {}",
            self.probes.echo_count
        );
        anyhow::ensure!(
            self.probes.echo_timeout_ms > 0,
            "probes.echo_timeout_ms must be > 0, got {}",
            self.probes.echo_timeout_ms
        );
        anyhow::ensure!(
            !self.probes.dns_host.is_empty(),
            "probes.dns_host must be non-empty"
        );
        anyhow::ensure!(
            self.probes.dns_timeout_ms > 0,
            "probes.dns_timeout_ms must be > 0, got {}",
            self.probes.dns_timeout_ms
        );
        anyhow::ensure!(
            self.probes.bandwidth_interval_ms > 0,
            "probes.bandwidth_interval_ms must be > 0, got {}",
            self.probes.bandwidth_interval_ms
        );
        anyhow::ensure!(
            self.probes.reference_link_mbps > 0,
            "probes.reference_link_mbps must be > 0, got {}",
            self.probes.reference_link_mbps
        );
        anyhow::ensure!(
            !self.model.artifact_path.is_empty(),
            "model.artifact_path must be non-empty"
        );
        anyhow::ensure!(
            !self.model.schema_path.is_empty(),
            "model.schema_path must be non-empty"
        );
        anyhow::ensure!(
            self.remediation.timeout_secs > 0,
            "remediation.timeout_secs must be > 0, got {}",
            self.remediation.timeout_secs
        );
        anyhow::ensure!(
            self.remediation.ping_count > 0,
            "remediation.ping_count must be > 0, got {}",
            self.remediation.ping_count
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        Ok(())
    }
}
