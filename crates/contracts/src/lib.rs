//! # Contracts
//!
//! Shared interface contracts for the capture agent: the data that flows
//! between the bus subscriber, the capture cycle and the uploader, plus the
//! traits behind which the external collaborators (bus client, camera
//! driver, cloud storage) live.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Photo names use local wall-clock time at second resolution
//! - Scheduling uses the monotonic tokio clock

mod bus;
mod camera;
mod clock;
mod config;
mod error;
mod photo;
mod reading;
mod store;

pub use bus::{BusPublisher, DeliveryGuarantee, LocalBusPublisher};
pub use camera::{Camera, LocalCamera, Resolution};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::*;
pub use error::*;
pub use photo::*;
pub use reading::{ReadingError, SensorReading, LED_FIELD};
pub use store::{LocalObjectStore, ObjectMetadata, ObjectStore, JPEG_MIME_TYPE};
