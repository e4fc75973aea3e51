//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::AgentConfig;
use tracing::info;

use crate::cli::InfoArgs;

use super::load_config;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = load_config(&args.config)?.redacted();

    if args.json {
        let json = config_loader::ConfigLoader::to_json(&config)
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn print_config_info(config: &AgentConfig) {
    let bus = &config.bus;
    println!("\n=== Capture Agent Configuration ===\n");

    println!("Bus:");
    println!(
        "  Broker: {}:{} ({})",
        bus.host,
        bus.port,
        if bus.tls { "tls" } else { "plain" }
    );
    println!("  Client id: {}", bus.client_id);
    if let Some(ref username) = bus.username {
        println!(
            "  Credentials: {} / {}",
            username,
            bus.password.as_deref().unwrap_or("-")
        );
    }
    println!("  Sensor topic: {}", bus.sensor_topic);
    println!("  Control topic: {} ({:?})", bus.control_topic, bus.control_qos);
    println!(
        "  Keep-alive: {}s, reconnect delay: {}s",
        bus.keep_alive_secs, bus.reconnect_delay_secs
    );

    let camera = &config.camera;
    println!("\nCamera:");
    println!("  Driver: {:?}", camera.driver);
    println!("  Command: {}", camera.command);
    println!("  Resolution: {}", camera.resolution());
    println!("  Capture dir: {}", camera.capture_dir.display());

    println!("\nTagging:");
    println!("  Prefix: {}_", config.tagging.prefix);
    println!("  Exif tag id: {}", config.tagging.tag_id);

    let upload = &config.upload;
    println!("\nUpload:");
    println!("  Store: {:?}", upload.store);
    println!("  Folder: {}", upload.folder_id);
    if let Some(ref key) = upload.credential_path {
        println!("  Credentials: {}", key.display());
    }
    println!(
        "  Attempts: {} ({}s backoff)",
        upload.max_attempts, upload.backoff_secs
    );

    let schedule = &config.schedule;
    println!("\nSchedule:");
    println!("  Period: {}s", schedule.period_secs);
    println!("  LED settle: {}s", schedule.settle_secs);
    println!("  Filesystem pause: {}s", schedule.fs_pause_secs);
    println!("  Retry backlog: {}", schedule.retry_backlog);

    println!();
}
