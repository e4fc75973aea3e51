//! # Scheduler
//!
//! Self-correcting capture loop: each cycle runs the LED handshake, tags
//! the photo, uploads it and then sleeps `period - elapsed`, so cycles
//! start one period apart regardless of how long the work took.
//!
//! ## Usage Example
//!
//! ```ignore
//! use scheduler::CycleScheduler;
//!
//! let scheduler = CycleScheduler::new(handshake, capturer, tagger, uploader, &config.schedule);
//! let stats = scheduler.run(shutdown).await;
//! println!("{}", stats.summary());
//! ```

mod record;
mod scheduler;

pub use record::{remaining_sleep, CycleRecord};
pub use scheduler::CycleScheduler;
