//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::AgentConfig;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::load_config;
use crate::cli::RunArgs;
use crate::pipeline::Agent;

/// Execute the `run` command
pub async fn run_agent(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut config = load_config(&args.config)?;

    // Apply CLI overrides
    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding MQTT host from CLI");
        config.bus.host = host.clone();
    }
    if let Some(port) = args.port {
        info!(port = %port, "Overriding MQTT port from CLI");
        config.bus.port = port;
    }
    config_loader::ConfigLoader::validate(&config).context("Invalid CLI overrides")?;

    info!(
        host = %config.bus.host,
        port = config.bus.port,
        sensor_topic = %config.bus.sensor_topic,
        camera = ?config.camera.driver,
        store = ?config.upload.store,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let agent = Agent::new(config);

    if args.once {
        let record = agent.run_once().await.context("Capture cycle failed")?;
        let mut cycles = observability::CycleMetricsAggregator::new();
        cycles.update(&record.observation());
        println!("\n{}", cycles.summary());
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let token = shutdown.clone();
        async move {
            shutdown_signal().await;
            warn!("Received shutdown signal, stopping agent...");
            token.cancel();
        }
    });

    let stats = agent
        .run(shutdown, Duration::from_secs(args.grace_secs))
        .await
        .context("Agent failed")?;
    stats.print_summary();

    info!("Capture agent finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &AgentConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Bus:");
    println!("  Broker: {}:{}", config.bus.host, config.bus.port);
    println!("  Sensor topic: {}", config.bus.sensor_topic);
    println!("  Control topic: {}", config.bus.control_topic);
    println!("\nCapture:");
    println!(
        "  Camera: {:?} at {}",
        config.camera.driver,
        config.camera.resolution()
    );
    println!("  Directory: {}", config.camera.capture_dir.display());
    println!(
        "  Tagged copy: {}_<timestamp>.jpeg (exif tag {})",
        config.tagging.prefix, config.tagging.tag_id
    );
    println!("\nUpload:");
    println!("  Store: {:?} -> {}", config.upload.store, config.upload.folder_id);
    if let Some(root) = &config.upload.local_root {
        println!("  Local root: {}", root.display());
    }
    println!(
        "  Attempts: {} ({}s backoff)",
        config.upload.max_attempts, config.upload.backoff_secs
    );
    println!("\nSchedule:");
    println!("  Every {}s", config.schedule.period_secs);
    println!();
}
