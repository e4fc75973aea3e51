//! # Uploader
//!
//! Moves tagged photos to cloud storage.
//!
//! - `Uploader`: bounded attempts with a fixed pause between failures
//! - `DriveStore`: Google Drive folder (service-account auth)
//! - `LocalDirStore`: plain directory, for offline setups

mod mock;
mod stores;
mod uploader;

pub use mock::FlakyStore;
pub use stores::{
    multipart_body, ConfiguredStore, DriveStore, LocalDirStore, DRIVE_SCOPE, DRIVE_UPLOAD_URL,
};
pub use uploader::Uploader;
