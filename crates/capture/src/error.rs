//! Capture crate error types

use std::path::PathBuf;

use thiserror::Error;

/// Metadata tagging errors
#[derive(Debug, Error)]
pub enum TagError {
    /// File is not a JPEG container we can rewrite
    #[error("'{}' is not a readable jpeg: {message}", path.display())]
    Container { path: PathBuf, message: String },

    /// EXIF block could not be serialized
    #[error("failed to write exif block for '{}': {source}", path.display())]
    ExifWrite {
        path: PathBuf,
        #[source]
        source: exif::Error,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TagError {
    /// Create container error
    pub fn container(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Container {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, TagError>;
