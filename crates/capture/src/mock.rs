//! Mock camera
//!
//! Writes a synthetic frame (or fails on demand) and logs each call into an
//! optional journal shared with the bus mock, so tests can assert the order
//! of LED commands around the exposure.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use contracts::{Camera, CaptureError, Resolution};
use ingestion::{journal_push, Journal};

use crate::camera::SyntheticCamera;

#[derive(Debug, Default)]
pub struct MockCamera {
    frames: SyntheticCamera,
    journal: Option<Journal>,
    failing: AtomicBool,
    calls: AtomicU32,
}

impl MockCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log `capture` / `capture-failed` entries into `journal`
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of capture requests so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn log(&self, entry: &str) {
        if let Some(journal) = &self.journal {
            journal_push(journal, entry);
        }
    }
}

impl Camera for MockCamera {
    fn name(&self) -> &str {
        "mock"
    }

    async fn capture_still(
        &self,
        resolution: Resolution,
        path: &Path,
    ) -> Result<(), CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            self.log("capture-failed");
            return Err(CaptureError::driver("mock", "camera unavailable"));
        }

        let jpeg = self.frames.encode_frame(resolution)?;
        tokio::fs::write(path, jpeg).await?;
        self.log("capture");
        Ok(())
    }
}
