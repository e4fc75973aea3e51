//! Capturer - one still per call, named after the capture time

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use contracts::{photo_file_name, Camera, CaptureError, Clock, PhotoCapture, Resolution, SystemClock};
use observability::record_capture;
use tracing::{info, instrument, warn};

/// First free path for `name` inside `dir`
///
/// `name` itself when unused, otherwise `<stem>-1.<ext>`, `<stem>-2.<ext>`, ...
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    };
    (1..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{stem}-{n}.{ext}")),
            None => dir.join(format!("{stem}-{n}")),
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Takes stills through a [`Camera`] into the capture directory
pub struct Capturer<C> {
    camera: C,
    resolution: Resolution,
    capture_dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl<C: Camera> Capturer<C> {
    pub fn new(camera: C, resolution: Resolution, capture_dir: impl Into<PathBuf>) -> Self {
        Self {
            camera,
            resolution,
            capture_dir: capture_dir.into(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall-clock source used for file names
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn capture_dir(&self) -> &Path {
        &self.capture_dir
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Take one still named after the current wall-clock time
    pub async fn take_photo(&self) -> Result<PhotoCapture, CaptureError> {
        self.take_photo_at(self.clock.now()).await
    }

    /// Take one still named after `taken_at`
    #[instrument(
        name = "capturer_take_photo",
        skip(self),
        fields(camera = %self.camera.name(), resolution = %self.resolution)
    )]
    pub async fn take_photo_at(&self, taken_at: NaiveDateTime) -> Result<PhotoCapture, CaptureError> {
        let path = unique_path(&self.capture_dir, &photo_file_name(taken_at));

        match self.camera.capture_still(self.resolution, &path).await {
            Ok(()) => {
                record_capture(self.camera.name(), true);
                info!(path = %path.display(), "Photo captured");
                Ok(PhotoCapture { path, taken_at })
            }
            Err(e) => {
                record_capture(self.camera.name(), false);
                warn!(path = %path.display(), error = %e, "Capture failed");
                Err(e)
            }
        }
    }
}
