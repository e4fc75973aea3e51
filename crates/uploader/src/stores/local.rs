//! LocalDirStore - copies uploads into a directory

use std::path::{Path, PathBuf};

use contracts::{ObjectMetadata, ObjectStore, UploadError};
use tracing::{debug, instrument};

/// Store that copies objects into `<root>/<parent>/<name>`
///
/// `parent` is the configured folder id; an absolute folder id replaces the
/// root entirely.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    name: String,
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            name: "local".to_string(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ObjectStore for LocalDirStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "local_store_create",
        skip(self, metadata, path),
        fields(object = %metadata.name, parent = %metadata.parent)
    )]
    async fn create_object(
        &self,
        metadata: &ObjectMetadata,
        path: &Path,
    ) -> Result<String, UploadError> {
        let folder = self.root.join(&metadata.parent);
        tokio::fs::create_dir_all(&folder).await?;

        let target = folder.join(&metadata.name);
        let bytes = tokio::fs::copy(path, &target).await?;
        debug!(target = %target.display(), bytes, "Object copied");

        Ok(target.display().to_string())
    }
}
