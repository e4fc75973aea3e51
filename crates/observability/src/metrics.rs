//! Capture agent metrics
//!
//! Counters and histograms for every step of the capture cycle and for the
//! bus subscription, plus an in-memory aggregator for end-of-run summaries.

use std::time::Duration;

use contracts::UploadOutcome;
use metrics::{counter, gauge, histogram};

/// What one cycle produced, as seen by the metrics layer
#[derive(Debug, Clone, Default)]
pub struct CycleObservation {
    /// Processing time from cycle start to end of upload
    pub elapsed: Duration,
    /// Sleep scheduled before the next cycle
    pub sleep: Duration,
    pub photo_taken: bool,
    pub tagged: bool,
    /// None when there was nothing to upload
    pub upload: Option<UploadOutcome>,
}

/// Record one finished cycle
///
/// # Example
///
/// ```ignore
/// let record = scheduler.run_cycle().await;
/// observability::record_cycle(&record.observation());
/// ```
pub fn record_cycle(observation: &CycleObservation) {
    counter!("capture_agent_cycles_total").increment(1);

    histogram!("capture_agent_cycle_duration_seconds").record(observation.elapsed.as_secs_f64());
    gauge!("capture_agent_cycle_sleep_seconds").set(observation.sleep.as_secs_f64());

    if observation.sleep.is_zero() {
        counter!("capture_agent_cycles_overrun_total").increment(1);
    }
    if !observation.photo_taken {
        counter!("capture_agent_cycles_without_photo_total").increment(1);
    }
}

/// Record a bus message, accepted or rejected as malformed
pub fn record_bus_message(accepted: bool) {
    let status = if accepted { "accepted" } else { "rejected" };
    counter!("capture_agent_bus_messages_total", "status" => status).increment(1);
}

/// Record an error returned while polling the bus connection
pub fn record_bus_connection_error() {
    counter!("capture_agent_bus_connection_errors_total").increment(1);
}

/// Record an LED command publish
pub fn record_led_command(command: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "capture_agent_led_commands_total",
        "command" => command.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a capture attempt
pub fn record_capture(camera: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "capture_agent_photos_total",
        "camera" => camera.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a tagging attempt
pub fn record_tag(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("capture_agent_tags_total", "status" => status).increment(1);
}

/// Record one upload attempt against a store
pub fn record_upload_attempt(store: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "capture_agent_upload_attempts_total",
        "store" => store.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record the final outcome of an upload call
pub fn record_upload(outcome: &UploadOutcome) {
    let status = if outcome.succeeded {
        "uploaded"
    } else {
        "kept"
    };
    counter!("capture_agent_uploads_total", "status" => status).increment(1);
    histogram!("capture_agent_upload_attempts").record(outcome.attempts as f64);
}

/// In-memory cycle statistics
#[derive(Debug, Clone, Default)]
pub struct CycleMetricsAggregator {
    pub total_cycles: u64,
    pub photos_taken: u64,
    pub photos_tagged: u64,
    pub uploads_succeeded: u64,
    pub uploads_failed: u64,
    /// Cycles whose processing overran the period
    pub overruns: u64,
    /// Processing time per cycle (seconds)
    pub cycle_duration: RunningStats,
    /// Attempts per upload call
    pub upload_attempts: RunningStats,
}

impl CycleMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one cycle into the aggregate
    pub fn update(&mut self, observation: &CycleObservation) {
        self.total_cycles += 1;
        if observation.photo_taken {
            self.photos_taken += 1;
        }
        if observation.tagged {
            self.photos_tagged += 1;
        }
        if observation.sleep.is_zero() {
            self.overruns += 1;
        }
        if let Some(outcome) = &observation.upload {
            if outcome.succeeded {
                self.uploads_succeeded += 1;
            } else {
                self.uploads_failed += 1;
            }
            self.upload_attempts.push(outcome.attempts as f64);
        }
        self.cycle_duration.push(observation.elapsed.as_secs_f64());
    }

    pub fn summary(&self) -> CycleSummary {
        let uploads = self.uploads_succeeded + self.uploads_failed;
        CycleSummary {
            total_cycles: self.total_cycles,
            photos_taken: self.photos_taken,
            photos_tagged: self.photos_tagged,
            uploads_succeeded: self.uploads_succeeded,
            uploads_failed: self.uploads_failed,
            overruns: self.overruns,
            upload_success_rate: if uploads > 0 {
                self.uploads_succeeded as f64 / uploads as f64 * 100.0
            } else {
                0.0
            },
            cycle_duration_secs: StatsSummary::from(&self.cycle_duration),
            upload_attempts: StatsSummary::from(&self.upload_attempts),
        }
    }
}

/// Aggregated report
#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub total_cycles: u64,
    pub photos_taken: u64,
    pub photos_tagged: u64,
    pub uploads_succeeded: u64,
    pub uploads_failed: u64,
    pub overruns: u64,
    pub upload_success_rate: f64,
    pub cycle_duration_secs: StatsSummary,
    pub upload_attempts: StatsSummary,
}

impl std::fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Capture Summary ===")?;
        writeln!(f, "Cycles: {}", self.total_cycles)?;
        writeln!(f, "Photos taken: {}", self.photos_taken)?;
        writeln!(f, "Photos tagged: {}", self.photos_tagged)?;
        writeln!(
            f,
            "Uploads: {} ok, {} kept on disk ({:.2}%)",
            self.uploads_succeeded, self.uploads_failed, self.upload_success_rate
        )?;
        writeln!(f, "Overruns: {}", self.overruns)?;
        writeln!(f, "Cycle duration (s): {}", self.cycle_duration_secs)?;
        writeln!(f, "Upload attempts: {}", self.upload_attempts)?;
        Ok(())
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
