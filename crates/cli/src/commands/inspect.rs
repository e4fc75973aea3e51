//! `inspect` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::InspectArgs;

/// Execute the `inspect` command
pub async fn run_inspect(args: &InspectArgs) -> Result<()> {
    info!(file = %args.file.display(), tag_id = args.tag_id, "Reading embedded sensor data");

    let reading = capture::read_embedded_tag(&args.file, args.tag_id)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    match reading {
        Some(text) => println!("{}", render(&text, args.pretty)),
        None => println!("No sensor reading embedded in {}", args.file.display()),
    }
    Ok(())
}

fn render(text: &str, pretty: bool) -> String {
    if !pretty {
        return text.to_string();
    }
    serde_json::from_str::<serde_json::Value>(text)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| text.to_string())
}
