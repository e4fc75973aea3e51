//! Store selected by `upload.store`

use std::path::Path;

use contracts::{ObjectMetadata, ObjectStore, StoreKind, UploadConfig, UploadError};

use super::{DriveStore, LocalDirStore};

pub enum ConfiguredStore {
    Drive(DriveStore),
    Local(LocalDirStore),
}

impl ConfiguredStore {
    /// Build the configured store
    ///
    /// The drive store loads its key here, so bad credentials fail at
    /// startup rather than on the first upload.
    pub fn from_config(config: &UploadConfig) -> Result<Self, UploadError> {
        match config.store {
            StoreKind::Drive => {
                let key = config
                    .credential_path
                    .as_deref()
                    .ok_or_else(|| UploadError::credentials("upload.credential_path is not set"))?;
                Ok(Self::Drive(DriveStore::from_key_file(key)?))
            }
            StoreKind::Local => {
                let root = config
                    .local_root
                    .as_deref()
                    .ok_or_else(|| UploadError::config("upload.local_root is not set"))?;
                Ok(Self::Local(LocalDirStore::new(root)))
            }
        }
    }
}

impl ObjectStore for ConfiguredStore {
    fn name(&self) -> &str {
        match self {
            Self::Drive(store) => store.name(),
            Self::Local(store) => store.name(),
        }
    }

    async fn create_object(
        &self,
        metadata: &ObjectMetadata,
        path: &Path,
    ) -> Result<String, UploadError> {
        match self {
            Self::Drive(store) => store.create_object(metadata, path).await,
            Self::Local(store) => store.create_object(metadata, path).await,
        }
    }
}
