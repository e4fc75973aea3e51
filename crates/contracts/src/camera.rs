//! Camera trait - still capture abstraction
//!
//! Decouples the capture cycle from the concrete driver (a capture command
//! on the device, or a synthetic source for dry runs and tests).

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::CaptureError;

/// Still frame resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Still camera
///
/// Each call configures the device for `resolution`, takes exactly one
/// frame, writes it as JPEG to `path`, and releases the device before
/// returning.
#[trait_variant::make(Camera: Send)]
pub trait LocalCamera {
    /// Camera name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Capture one still frame into `path`
    ///
    /// # Errors
    /// Returns [`CaptureError`] when the driver fails or the file cannot be written
    async fn capture_still(&self, resolution: Resolution, path: &Path)
        -> Result<(), CaptureError>;
}
