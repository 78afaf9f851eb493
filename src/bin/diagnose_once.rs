// Run one diagnosis against config.toml and print the report as JSON.
//
// Usage: diagnose-once [--remediate]
//   --remediate  also dispatch the predicted label's action and print its outcome
// Config path comes from CONFIG_FILE (default: config.toml); logs go to stderr.

use netdiag::classifier::Classifier;
use netdiag::config::AppConfig;
use netdiag::pipeline::DiagnosisService;
use netdiag::probes::SystemProbes;
use netdiag::remediation::Dispatcher;
use netdiag::sampler::Sampler;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let remediate = env::args().skip(1).any(|a| a == "--remediate");

    let config = AppConfig::load()?;
    // Nothing useful can happen without a model, so missing files are always fatal here
    let classifier = Classifier::load(
        Path::new(&config.model.artifact_path),
        Path::new(&config.model.schema_path),
        true,
    )?;
    let probes = Arc::new(SystemProbes::new(config.probes.clone()));
    let service = DiagnosisService::new(
        Sampler::new(probes, (&config.sampling).into()),
        classifier,
        Dispatcher::new(&config.remediation),
    );

    let report = service.run_diagnosis().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if remediate {
        let outcome = service.dispatch_remediation(report.label).await;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }
    Ok(())
}
