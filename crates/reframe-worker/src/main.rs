//! Batch smart-crop worker binary.
//!
//! Usage: `reframe-worker <video>...`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reframe_media::SubjectDetector;
use reframe_worker::{VideoProcessor, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing()?;

    let inputs: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if inputs.is_empty() {
        bail!("usage: reframe-worker <video>...");
    }

    info!("Starting reframe-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(port) = config.metrics_port {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(port, "Prometheus exporter listening");
    }

    // Model sessions are loaded once and shared by every run
    let tracking = config.tracking_config();
    let detector = tokio::task::spawn_blocking(move || SubjectDetector::from_config(&tracking))
        .await
        .context("Detector initialization panicked")?
        .context("Failed to load detection models")?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, cancelling runs");
            let _ = cancel_tx.send(true);
        }
    });

    let processor = VideoProcessor::new(config, Arc::new(detector)).with_cancel(cancel_rx);
    let results = processor.process_all(inputs).await;

    let mut failed = 0usize;
    for (input, result) in &results {
        match result {
            Ok(output) => info!(input = %input.display(), output = %output.display(), "Reframed"),
            Err(e) => {
                failed += 1;
                error!(input = %input.display(), error = %e, "Failed");
            }
        }
    }

    info!(total = results.len(), failed, "Worker shutdown complete");

    if failed > 0 {
        bail!("{} of {} videos failed", failed, results.len());
    }
    Ok(())
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("reframe=info".parse()?)
        .add_directive("ort=warn".parse()?)
        .add_directive("onnxruntime=warn".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .with(env_filter)
            .init();
    }

    Ok(())
}
