//! Store implementations
//!
//! Contains DriveStore, LocalDirStore and the config-driven ConfiguredStore.

mod configured;
mod drive;
mod local;

pub use self::configured::ConfiguredStore;
pub use self::drive::{multipart_body, DriveStore, DRIVE_SCOPE, DRIVE_UPLOAD_URL};
pub use self::local::LocalDirStore;
