//! ObjectStore trait - cloud storage output interface

use std::path::Path;

use crate::UploadError;

/// MIME type of every artifact the agent uploads
pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// Metadata sent alongside an uploaded object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Remote object name
    pub name: String,
    /// Destination folder / bucket identifier
    pub parent: String,
    /// Content type
    pub mime_type: String,
}

impl ObjectMetadata {
    /// Metadata for a JPEG stored under `parent`
    pub fn jpeg(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: parent.into(),
            mime_type: JPEG_MIME_TYPE.to_string(),
        }
    }
}

/// Cloud storage
#[trait_variant::make(ObjectStore: Send)]
pub trait LocalObjectStore {
    /// Store name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Create one object from the file at `path`
    ///
    /// Returns the server-assigned object identifier.
    async fn create_object(
        &self,
        metadata: &ObjectMetadata,
        path: &Path,
    ) -> Result<String, UploadError>;
}
