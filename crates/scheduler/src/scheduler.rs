//! CycleScheduler - hourly capture, tag, upload loop
//!
//! One cycle:
//!
//! 1. (optional) re-upload tagged leftovers from earlier cycles
//! 2. LED handshake around the capture
//! 3. filesystem settle pause
//! 4. tag a copy with the latest sensor reading
//! 5. upload the tagged copy
//! 6. delete both local files once the upload is confirmed
//! 7. sleep whatever is left of the period
//!
//! No step can end the loop; only the shutdown token does.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use capture::{Capturer, LedHandshake, MetadataTagger};
use contracts::{
    BusPublisher, Camera, ObjectStore, ScheduleConfig, TaggedPhoto, UploadOutcome, PHOTO_EXTENSION,
};
use observability::{record_cycle, CycleMetricsAggregator};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uploader::Uploader;

use crate::record::{remaining_sleep, CycleRecord};

pub struct CycleScheduler<P, C, S> {
    handshake: LedHandshake<P>,
    capturer: Capturer<C>,
    tagger: MetadataTagger,
    uploader: Uploader<S>,
    period: Duration,
    fs_pause: Duration,
    retry_backlog: bool,
    cycles: AtomicU64,
}

impl<P, C, S> CycleScheduler<P, C, S>
where
    P: BusPublisher,
    C: Camera,
    S: ObjectStore,
{
    pub fn new(
        handshake: LedHandshake<P>,
        capturer: Capturer<C>,
        tagger: MetadataTagger,
        uploader: Uploader<S>,
        schedule: &ScheduleConfig,
    ) -> Self {
        Self {
            handshake,
            capturer,
            tagger,
            uploader,
            period: schedule.period(),
            fs_pause: schedule.fs_pause(),
            retry_backlog: schedule.retry_backlog,
            cycles: AtomicU64::new(0),
        }
    }

    pub fn handshake(&self) -> &LedHandshake<P> {
        &self.handshake
    }

    pub fn capturer(&self) -> &Capturer<C> {
        &self.capturer
    }

    pub fn uploader(&self) -> &Uploader<S> {
        &self.uploader
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run cycles until `shutdown` fires
    ///
    /// The token is checked between cycles and during the period sleep; a
    /// cycle that has started runs to completion.
    pub async fn run(&self, shutdown: CancellationToken) -> CycleMetricsAggregator {
        let mut stats = CycleMetricsAggregator::new();
        info!(period_secs = self.period.as_secs(), "Scheduler started");

        while !shutdown.is_cancelled() {
            let record = self.run_cycle().await;
            stats.update(&record.observation());

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(record.sleep) => {}
            }
        }

        info!(cycles = stats.total_cycles, "Scheduler stopped");
        stats
    }

    /// Run exactly one cycle
    #[instrument(name = "scheduler_cycle", skip(self))]
    pub async fn run_cycle(&self) -> CycleRecord {
        let start = Instant::now();
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;

        let backlog = if self.retry_backlog {
            self.upload_backlog().await
        } else {
            Vec::new()
        };

        let photo = self.handshake.toggle_and_capture(&self.capturer).await;

        tokio::time::sleep(self.fs_pause).await;

        let tagged = match &photo {
            Some(photo) => match self.tagger.embed(photo).await {
                Ok(tagged) => Some(tagged),
                Err(e) => {
                    warn!(photo = %photo.file_name(), error = %e, "Tagging failed");
                    None
                }
            },
            None => None,
        };

        let mut removed = 0;
        let upload = match &tagged {
            Some(tagged) => {
                let outcome = self
                    .uploader
                    .upload(&tagged.path, self.uploader.max_attempts())
                    .await;
                if outcome.succeeded {
                    removed = remove_artifacts(tagged).await;
                } else {
                    warn!(
                        tagged = %tagged.path.display(),
                        original = %tagged.original.display(),
                        "Upload failed, photo kept on disk"
                    );
                }
                Some(outcome)
            }
            None => None,
        };

        let elapsed = start.elapsed();
        let sleep = remaining_sleep(self.period, elapsed);
        if sleep.is_zero() {
            warn!(
                elapsed_secs = elapsed.as_secs_f64(),
                period_secs = self.period.as_secs(),
                "Cycle overran the period, starting next cycle immediately"
            );
        }

        let record = CycleRecord {
            cycle,
            photo,
            tagged,
            upload,
            backlog,
            removed,
            elapsed,
            sleep,
        };
        record_cycle(&record.observation());
        info!(
            cycle,
            photo = record.photo.is_some(),
            uploaded = record.uploaded(),
            elapsed_secs = elapsed.as_secs_f64(),
            sleep_secs = sleep.as_secs_f64(),
            "Cycle finished"
        );
        record
    }

    /// Tagged files left in the capture directory by earlier failed uploads
    async fn backlog_files(&self) -> Vec<PathBuf> {
        let dir = self.capturer.capture_dir();
        let prefix = format!("{}_", self.tagger.prefix());
        let suffix = format!(".{PHOTO_EXTENSION}");

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot list capture directory");
                return Vec::new();
            }
        };

        let mut files = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if name.starts_with(&prefix) && name.ends_with(&suffix) {
                        files.push(entry.path());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Capture directory listing aborted");
                    break;
                }
            }
        }
        files.sort();
        files
    }

    async fn upload_backlog(&self) -> Vec<UploadOutcome> {
        let files = self.backlog_files().await;
        if files.is_empty() {
            return Vec::new();
        }
        info!(count = files.len(), "Retrying backlog uploads");

        let prefix = format!("{}_", self.tagger.prefix());
        let mut outcomes = Vec::with_capacity(files.len());
        for path in files {
            let outcome = self
                .uploader
                .upload(&path, self.uploader.max_attempts())
                .await;
            if outcome.succeeded {
                let original = original_of(&path, &prefix);
                remove_artifacts(&TaggedPhoto {
                    path: path.clone(),
                    original,
                    reading: None,
                })
                .await;
            }
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Untagged sibling of a tagged file
fn original_of(tagged: &Path, prefix: &str) -> PathBuf {
    let name = tagged
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let original = name.strip_prefix(prefix).unwrap_or(&name);
    tagged.with_file_name(original)
}

/// Delete the tagged copy and its original; returns how many were removed
async fn remove_artifacts(tagged: &TaggedPhoto) -> usize {
    let mut removed = 0;
    for path in [&tagged.path, &tagged.original] {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                removed += 1;
                debug!(path = %path.display(), "Removed uploaded photo");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove photo"),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use capture::MockCamera;
    use chrono::NaiveDate;
    use contracts::{FixedClock, Resolution, SensorReading};
    use ingestion::{RecordingBus, SensorChannel};
    use tempfile::{tempdir, TempDir};
    use uploader::FlakyStore;

    type TestScheduler = CycleScheduler<RecordingBus, MockCamera, FlakyStore>;

    fn schedule(retry_backlog: bool) -> ScheduleConfig {
        ScheduleConfig {
            retry_backlog,
            ..ScheduleConfig::default()
        }
    }

    fn build(
        store: FlakyStore,
        schedule: &ScheduleConfig,
    ) -> (TestScheduler, Arc<SensorChannel>, TempDir) {
        let dir = tempdir().unwrap();
        let channel = Arc::new(SensorChannel::new());
        let noon = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        let handshake = LedHandshake::new(
            RecordingBus::new(),
            Arc::clone(&channel),
            "input_led",
            schedule.settle(),
        );
        let capturer = Capturer::new(MockCamera::new(), Resolution::new(32, 24), dir.path())
            .with_clock(Arc::new(FixedClock(noon)));
        let tagger = MetadataTagger::new(Arc::clone(&channel), "exif", 42036);
        let uploader = Uploader::new(store, "folder").with_backoff(Duration::from_secs(10));

        let scheduler = CycleScheduler::new(handshake, capturer, tagger, uploader, schedule);
        (scheduler, channel, dir)
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_uploads_and_cleans_up() {
        let (scheduler, channel, dir) = build(FlakyStore::new(0), &schedule(false));
        channel.update(SensorReading::new(r#"{"ledOn":true}"#, Some(true)));

        let record = scheduler.run_cycle().await;

        let photo = record.photo.as_ref().unwrap();
        assert_eq!(photo.file_name(), "20240101120000.jpeg");
        let tagged = record.tagged.as_ref().unwrap();
        assert_eq!(tagged.file_name(), "exif_20240101120000.jpeg");
        assert_eq!(tagged.reading.as_deref(), Some(r#"{"ledOn":true}"#));

        assert_eq!(scheduler.handshake().bus().payloads(), vec!["1", "true"]);

        let stored = scheduler.uploader().store().stored();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "exif_20240101120000.jpeg");
        assert!(record.uploaded());

        assert_eq!(record.removed, 2);
        assert!(!dir.path().join("20240101120000.jpeg").exists());
        assert!(!dir.path().join("exif_20240101120000.jpeg").exists());

        // settle 10 s twice plus the 1 s filesystem pause
        assert_eq!(record.elapsed, Duration::from_secs(21));
        assert_eq!(record.sleep, Duration::from_secs(3579));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_upload_keeps_files_and_still_sleeps() {
        let (scheduler, _channel, dir) = build(FlakyStore::always_failing(), &schedule(false));

        let record = scheduler.run_cycle().await;

        let upload = record.upload.as_ref().unwrap();
        assert!(!upload.succeeded);
        assert_eq!(upload.attempts, 3);
        assert_eq!(record.removed, 0);
        assert!(dir.path().join("20240101120000.jpeg").exists());
        assert!(dir.path().join("exif_20240101120000.jpeg").exists());

        // 21 s of handshake and pause plus two 10 s backoffs
        assert_eq!(record.elapsed, Duration::from_secs(41));
        assert_eq!(record.sleep, Duration::from_secs(3559));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_failure_skips_tag_and_upload() {
        let (scheduler, _channel, _dir) = build(FlakyStore::new(0), &schedule(false));
        scheduler.capturer().camera().set_failing(true);

        let record = scheduler.run_cycle().await;

        assert!(record.photo.is_none());
        assert!(record.tagged.is_none());
        assert!(record.upload.is_none());
        assert_eq!(scheduler.uploader().store().attempts(), 0);
        assert_eq!(scheduler.handshake().bus().payloads(), vec!["1", "false"]);
        assert_eq!(record.sleep, Duration::from_secs(3579));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backlog_retried_when_enabled() {
        let (scheduler, _channel, dir) = build(FlakyStore::new(0), &schedule(true));
        std::fs::write(dir.path().join("20231231110000.jpeg"), b"old").unwrap();
        std::fs::write(dir.path().join("exif_20231231110000.jpeg"), b"old").unwrap();

        let record = scheduler.run_cycle().await;

        assert_eq!(record.backlog.len(), 1);
        assert!(record.backlog[0].succeeded);
        let names: Vec<_> = scheduler
            .uploader()
            .store()
            .stored()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(
            names,
            vec!["exif_20231231110000.jpeg", "exif_20240101120000.jpeg"]
        );
        assert!(!dir.path().join("20231231110000.jpeg").exists());
        assert!(!dir.path().join("exif_20231231110000.jpeg").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backlog_ignored_by_default() {
        let (scheduler, _channel, dir) = build(FlakyStore::new(0), &schedule(false));
        std::fs::write(dir.path().join("exif_20231231110000.jpeg"), b"old").unwrap();

        let record = scheduler.run_cycle().await;

        assert!(record.backlog.is_empty());
        assert_eq!(scheduler.uploader().store().stored().len(), 1);
        assert!(dir.path().join("exif_20231231110000.jpeg").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_keeps_period_until_cancelled() {
        let config = ScheduleConfig {
            period_secs: 60,
            settle_secs: 1,
            fs_pause_secs: 1,
            retry_backlog: false,
        };
        let (scheduler, _channel, _dir) = build(FlakyStore::new(0), &config);

        let token = CancellationToken::new();
        let handle = tokio::spawn({
            let token = token.clone();
            async move {
                let stats = scheduler.run(token).await;
                (stats, scheduler)
            }
        });

        // Cycles start at 0 s, 60 s and 120 s
        tokio::time::sleep(Duration::from_secs(150)).await;
        token.cancel();
        let (stats, scheduler) = handle.await.unwrap();

        assert_eq!(stats.total_cycles, 3);
        assert_eq!(stats.uploads_succeeded, 3);
        assert_eq!(stats.overruns, 0);
        assert_eq!(scheduler.handshake().bus().payloads().len(), 6);
    }
}
