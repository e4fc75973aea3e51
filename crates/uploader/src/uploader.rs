//! Uploader - fixed-backoff retry around an ObjectStore

use std::path::Path;
use std::time::Duration;

use contracts::{ObjectMetadata, ObjectStore, UploadConfig, UploadOutcome};
use observability::{record_upload, record_upload_attempt};
use tracing::{info, instrument, warn};

pub struct Uploader<S> {
    store: S,
    folder_id: String,
    max_attempts: u32,
    backoff: Duration,
}

impl<S: ObjectStore> Uploader<S> {
    pub fn new(store: S, folder_id: impl Into<String>) -> Self {
        Self {
            store,
            folder_id: folder_id.into(),
            max_attempts: 3,
            backoff: Duration::from_secs(10),
        }
    }

    pub fn from_config(store: S, config: &UploadConfig) -> Self {
        Self::new(store, &config.folder_id)
            .with_max_attempts(config.max_attempts)
            .with_backoff(config.backoff())
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Configured attempt budget
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Upload `path` under its own file name into the configured folder
    ///
    /// Makes at most `max_attempts` attempts, sleeping the fixed backoff
    /// between failures (not after the last one). Never returns an error:
    /// exhaustion is reported as `succeeded = false`.
    #[instrument(
        name = "uploader_upload",
        skip(self, path),
        fields(store = %self.store.name(), path = %path.display())
    )]
    pub async fn upload(&self, path: &Path, max_attempts: u32) -> UploadOutcome {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let metadata = ObjectMetadata::jpeg(name, &self.folder_id);

        for attempt in 1..=max_attempts {
            match self.store.create_object(&metadata, path).await {
                Ok(object_id) => {
                    record_upload_attempt(self.store.name(), true);
                    info!(
                        object = %metadata.name,
                        %object_id,
                        attempt,
                        "Upload complete"
                    );
                    let outcome = UploadOutcome::success(attempt, object_id);
                    record_upload(&outcome);
                    return outcome;
                }
                Err(e) => {
                    record_upload_attempt(self.store.name(), false);
                    warn!(
                        object = %metadata.name,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Upload attempt failed"
                    );
                    if attempt < max_attempts {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
            }
        }

        warn!(object = %metadata.name, max_attempts, "Upload attempts exhausted");
        let outcome = UploadOutcome::exhausted(max_attempts);
        record_upload(&outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::FlakyStore;
    use tempfile::tempdir;
    use tokio::time::Instant;

    fn photo(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("exif_20240101120000.jpeg");
        std::fs::write(&path, b"jpeg").unwrap();
        path
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fail_succeed() {
        let dir = tempdir().unwrap();
        let path = photo(dir.path());
        let uploader = Uploader::new(FlakyStore::new(2), "folder");

        let start = Instant::now();
        let outcome = uploader.upload(&path, 3).await;

        assert!(outcome.succeeded);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.object_id.as_deref(), Some("mock-3"));
        assert_eq!(uploader.store().attempts(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(20));

        let stored = uploader.store().stored();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "exif_20240101120000.jpeg");
        assert_eq!(stored[0].parent, "folder");
        assert_eq!(stored[0].mime_type, "image/jpeg");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_without_trailing_sleep() {
        let dir = tempdir().unwrap();
        let path = photo(dir.path());
        let uploader = Uploader::new(FlakyStore::always_failing(), "folder")
            .with_backoff(Duration::from_secs(7));

        let start = Instant::now();
        let outcome = uploader.upload(&path, 3).await;

        assert_eq!(outcome, UploadOutcome::exhausted(3));
        assert_eq!(uploader.store().attempts(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(14));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success_no_sleep() {
        let dir = tempdir().unwrap();
        let path = photo(dir.path());
        let uploader = Uploader::new(FlakyStore::new(0), "folder");

        let start = Instant::now();
        let outcome = uploader.upload(&path, 3).await;

        assert!(outcome.succeeded);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_attempt_budget() {
        let dir = tempdir().unwrap();
        let path = photo(dir.path());

        for budget in [1, 2, 5] {
            let uploader = Uploader::new(FlakyStore::always_failing(), "folder");
            let outcome = uploader.upload(&path, budget).await;
            assert!(!outcome.succeeded);
            assert_eq!(outcome.attempts, budget);
            assert_eq!(uploader.store().attempts(), budget);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_file_exhausts() {
        let dir = tempdir().unwrap();
        let uploader = Uploader::new(FlakyStore::new(0), "folder");

        let outcome = uploader
            .upload(&dir.path().join("gone.jpeg"), 2)
            .await;
        assert!(!outcome.succeeded);
        assert_eq!(outcome.attempts, 2);
    }
}
