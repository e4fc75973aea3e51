//! `validate` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use contracts::{AgentConfig, CameraDriver, StoreKind};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    broker: String,
    sensor_topic: String,
    control_topic: String,
    camera: String,
    resolution: String,
    store: String,
    period_secs: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(summarize(&config)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn summarize(config: &AgentConfig) -> ConfigSummary {
    ConfigSummary {
        version: format!("{:?}", config.version),
        broker: format!("{}:{}", config.bus.host, config.bus.port),
        sensor_topic: config.bus.sensor_topic.clone(),
        control_topic: config.bus.control_topic.clone(),
        camera: format!("{:?}", config.camera.driver).to_lowercase(),
        resolution: config.camera.resolution().to_string(),
        store: format!("{:?}", config.upload.store).to_lowercase(),
        period_secs: config.schedule.period_secs,
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &AgentConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.bus.tls && config.bus.password.is_some() {
        warnings.push("bus.password is sent without TLS".to_string());
    }

    if config.camera.driver == CameraDriver::Synthetic {
        warnings.push("camera.driver is synthetic - no real photos will be taken".to_string());
    }

    if config.upload.store == StoreKind::Local {
        warnings.push(format!(
            "upload.store is local - photos are copied to '{}' instead of the cloud",
            config
                .upload
                .local_root
                .as_deref()
                .unwrap_or_else(|| Path::new("."))
                .join(&config.upload.folder_id)
                .display()
        ));
    }

    let schedule = &config.schedule;
    let fixed_work = 2 * schedule.settle_secs + schedule.fs_pause_secs;
    if fixed_work >= schedule.period_secs {
        warnings.push(format!(
            "schedule.period_secs ({}) is not longer than the fixed pauses of one cycle ({}s) - every cycle will overrun",
            schedule.period_secs, fixed_work
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Broker: {}", summary.broker);
            println!("  Sensor topic: {}", summary.sensor_topic);
            println!("  Control topic: {}", summary.control_topic);
            println!("  Camera: {} ({})", summary.camera, summary.resolution);
            println!("  Store: {}", summary.store);
            println!("  Period: {}s", summary.period_secs);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    const CONFIG: &str = r#"
[bus]
host = "broker.local"
tls = false
username = "agent"
password = "secret"
sensor_topic = "sensors/box1"

[camera]
driver = "synthetic"

[upload]
store = "local"
folder_id = "uploads"
local_root = "/srv/photos"

[schedule]
period_secs = 15
"#;

    #[test]
    fn test_collect_warnings() {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let warnings = collect_warnings(&config);
        assert_eq!(warnings.len(), 4);
        assert!(warnings[0].contains("without TLS"));
        assert!(warnings[3].contains("overrun"));
    }

    #[test]
    fn test_summary() {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let summary = summarize(&config);
        assert_eq!(summary.broker, "broker.local:8883");
        assert_eq!(summary.camera, "synthetic");
        assert_eq!(summary.store, "local");
        assert_eq!(summary.resolution, "1920x1080");
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let args = ValidateArgs {
            config: "/nonexistent/agent.toml".into(),
            json: true,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
