//! # Capture
//!
//! Everything that happens to a photo before upload:
//!
//! - `CommandCamera` / `SyntheticCamera`: camera drivers
//! - `Capturer`: one still per call, `<YYYYMMDDHHMMSS>.jpeg`
//! - `LedHandshake`: LED on, capture, LED restore
//! - `MetadataTagger`: `<prefix>_<name>` copy with the sensor reading in EXIF

mod camera;
mod capturer;
mod error;
mod handshake;
mod mock;
mod tagger;

pub use camera::{CommandCamera, ConfiguredCamera, SyntheticCamera};
pub use capturer::{unique_path, Capturer};
pub use error::{Result, TagError};
pub use handshake::{restore_command, LedHandshake, LED_ON_COMMAND};
pub use mock::MockCamera;
pub use tagger::{read_embedded_tag, reading_tag, MetadataTagger};
