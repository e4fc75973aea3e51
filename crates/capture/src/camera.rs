//! Camera drivers
//!
//! - `CommandCamera`: shells out to a still-capture program on the device
//! - `SyntheticCamera`: encodes a generated frame, no hardware needed

use std::io::Cursor;
use std::path::Path;
use std::process::Stdio;

use contracts::{Camera, CameraConfig, CameraDriver, CaptureError, Resolution};
use image::{ImageFormat, Rgb, RgbImage};
use tokio::process::Command;
use tracing::{debug, instrument};

/// Camera driven by an external still-capture command
///
/// The command is invoked as
/// `<program> -n -t 1 --width <w> --height <h> -o <path>`, which is the
/// argument layout of `rpicam-still`. The child process opens the device,
/// takes one frame and releases the device when it exits.
#[derive(Debug, Clone)]
pub struct CommandCamera {
    name: String,
    program: String,
}

impl CommandCamera {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        Self {
            name: format!("command:{program}"),
            program,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, resolution: Resolution, path: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-n")
            .arg("-t")
            .arg("1")
            .arg("--width")
            .arg(resolution.width.to_string())
            .arg("--height")
            .arg(resolution.height.to_string())
            .arg("-o")
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

impl Camera for CommandCamera {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "command_camera_capture",
        skip(self, path),
        fields(program = %self.program, path = %path.display())
    )]
    async fn capture_still(
        &self,
        resolution: Resolution,
        path: &Path,
    ) -> Result<(), CaptureError> {
        let output = self
            .command(resolution, path)
            .output()
            .await
            .map_err(|e| {
                CaptureError::driver(&self.name, format!("failed to start {}: {e}", self.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptureError::driver(
                &self.name,
                format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            ));
        }

        if !tokio::fs::try_exists(path).await? {
            return Err(CaptureError::driver(
                &self.name,
                format!("{} exited cleanly but wrote no file", self.program),
            ));
        }

        debug!(%resolution, "Still written by capture command");
        Ok(())
    }
}

/// Camera producing a solid-colour JPEG
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    name: String,
    color: [u8; 3],
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self::with_color([96, 160, 64])
    }

    pub fn with_color(color: [u8; 3]) -> Self {
        Self {
            name: "synthetic".to_string(),
            color,
        }
    }

    /// Encode one frame in memory
    pub fn encode_frame(&self, resolution: Resolution) -> Result<Vec<u8>, CaptureError> {
        encode_solid_jpeg(resolution, self.color)
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for SyntheticCamera {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "synthetic_camera_capture",
        skip(self, path),
        fields(path = %path.display())
    )]
    async fn capture_still(
        &self,
        resolution: Resolution,
        path: &Path,
    ) -> Result<(), CaptureError> {
        let color = self.color;
        let jpeg = tokio::task::spawn_blocking(move || encode_solid_jpeg(resolution, color))
            .await
            .map_err(|e| CaptureError::Encode {
                message: e.to_string(),
            })??;

        tokio::fs::write(path, &jpeg).await?;
        debug!(%resolution, bytes = jpeg.len(), "Synthetic still written");
        Ok(())
    }
}

/// Camera selected by `camera.driver`
#[derive(Debug, Clone)]
pub enum ConfiguredCamera {
    Command(CommandCamera),
    Synthetic(SyntheticCamera),
}

impl ConfiguredCamera {
    pub fn from_config(config: &CameraConfig) -> Self {
        match config.driver {
            CameraDriver::Command => Self::Command(CommandCamera::new(&config.command)),
            CameraDriver::Synthetic => Self::Synthetic(SyntheticCamera::new()),
        }
    }
}

impl Camera for ConfiguredCamera {
    fn name(&self) -> &str {
        match self {
            Self::Command(camera) => camera.name(),
            Self::Synthetic(camera) => camera.name(),
        }
    }

    async fn capture_still(
        &self,
        resolution: Resolution,
        path: &Path,
    ) -> Result<(), CaptureError> {
        match self {
            Self::Command(camera) => camera.capture_still(resolution, path).await,
            Self::Synthetic(camera) => camera.capture_still(resolution, path).await,
        }
    }
}

fn encode_solid_jpeg(resolution: Resolution, color: [u8; 3]) -> Result<Vec<u8>, CaptureError> {
    if resolution.width == 0 || resolution.height == 0 {
        return Err(CaptureError::Encode {
            message: format!("invalid resolution {resolution}"),
        });
    }

    let frame = RgbImage::from_pixel(resolution.width, resolution.height, Rgb(color));
    let mut buf = Cursor::new(Vec::new());
    frame
        .write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(|e| CaptureError::Encode {
            message: e.to_string(),
        })?;
    Ok(buf.into_inner())
}
