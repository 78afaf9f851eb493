use anyhow::Result;
use netdiag::*;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let (events_tx, _) =
        broadcast::channel::<models::DiagnosisEvent>(app_config.publishing.broadcast_capacity);

    // Artifact and schema load together; a mismatched pair stops startup here
    let classifier = classifier::Classifier::load(
        Path::new(&app_config.model.artifact_path),
        Path::new(&app_config.model.schema_path),
        app_config.model.require_on_startup,
    )?;

    let probes = Arc::new(probes::SystemProbes::new(app_config.probes.clone()));
    let sampler = sampler::Sampler::new(probes, (&app_config.sampling).into());
    let dispatcher = remediation::Dispatcher::new(&app_config.remediation);
    let service = Arc::new(
        pipeline::DiagnosisService::new(sampler, classifier, dispatcher)
            .with_events(events_tx.clone()),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = match app_config.monitoring.auto_diagnose_interval_secs {
        0 => None,
        interval_secs => Some(worker::spawn(
            worker::WorkerDeps {
                service: service.clone(),
                shutdown_rx,
            },
            worker::WorkerConfig { interval_secs },
        )),
    };

    let ws_connections = Arc::new(AtomicUsize::new(0));
    let app = routes::app(service, events_tx, ws_connections);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            if let Some(handle) = worker_handle {
                let _ = handle.await;
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
