//! Photo artifacts produced by one capture cycle

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;

/// File extension of every captured still
pub const PHOTO_EXTENSION: &str = "jpeg";

/// Timestamp layout used in photo file names
pub const PHOTO_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// `<YYYYMMDDHHMMSS>.jpeg`
pub fn photo_file_name(taken_at: NaiveDateTime) -> String {
    format!(
        "{}.{}",
        taken_at.format(PHOTO_TIMESTAMP_FORMAT),
        PHOTO_EXTENSION
    )
}

/// `<prefix>_<original>`
pub fn tagged_file_name(prefix: &str, original: &str) -> String {
    format!("{prefix}_{original}")
}

/// One still image on local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoCapture {
    /// Location of the JPEG
    pub path: PathBuf,
    /// Wall-clock time the capture was requested
    pub taken_at: NaiveDateTime,
}

impl PhotoCapture {
    /// File name component of the path
    pub fn file_name(&self) -> &str {
        file_name_of(&self.path)
    }
}

/// A copy of a [`PhotoCapture`] carrying the sensor reading in its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedPhoto {
    /// Location of the tagged copy
    pub path: PathBuf,
    /// Untouched original
    pub original: PathBuf,
    /// Payload embedded at tagging time (None when no reading had arrived)
    pub reading: Option<Arc<str>>,
}

impl TaggedPhoto {
    /// File name component of the tagged path
    pub fn file_name(&self) -> &str {
        file_name_of(&self.path)
    }
}

/// Result of one upload call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub succeeded: bool,
    /// Attempts actually made, including the successful one
    pub attempts: u32,
    /// Server-assigned identifier on success
    pub object_id: Option<String>,
}

impl UploadOutcome {
    pub fn success(attempts: u32, object_id: String) -> Self {
        Self {
            succeeded: true,
            attempts,
            object_id: Some(object_id),
        }
    }

    pub fn exhausted(attempts: u32) -> Self {
        Self {
            succeeded: false,
            attempts,
            object_id: None,
        }
    }
}

fn file_name_of(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_photo_file_name() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(photo_file_name(ts), "20240101120000.jpeg");
        assert_eq!(
            tagged_file_name("exif", &photo_file_name(ts)),
            "exif_20240101120000.jpeg"
        );
    }
}
