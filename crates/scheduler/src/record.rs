//! CycleRecord - what one capture cycle did

use std::time::Duration;

use contracts::{PhotoCapture, TaggedPhoto, UploadOutcome};
use observability::CycleObservation;

/// Sleep before the next cycle so that cycles start `period` apart
///
/// Zero when the cycle overran the period.
pub fn remaining_sleep(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed)
}

/// Outcome of one cycle
#[derive(Debug, Clone, Default)]
pub struct CycleRecord {
    /// 1-based cycle counter
    pub cycle: u64,
    pub photo: Option<PhotoCapture>,
    pub tagged: Option<TaggedPhoto>,
    /// None when there was no tagged photo to upload
    pub upload: Option<UploadOutcome>,
    /// Uploads of leftovers from earlier cycles
    pub backlog: Vec<UploadOutcome>,
    /// Local files removed after a confirmed upload
    pub removed: usize,
    pub elapsed: Duration,
    pub sleep: Duration,
}

impl CycleRecord {
    pub fn uploaded(&self) -> bool {
        self.upload.as_ref().is_some_and(|o| o.succeeded)
    }

    pub fn observation(&self) -> CycleObservation {
        CycleObservation {
            elapsed: self.elapsed,
            sleep: self.sleep,
            photo_taken: self.photo.is_some(),
            tagged: self.tagged.is_some(),
            upload: self.upload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_sleep() {
        let hour = Duration::from_secs(3600);
        assert_eq!(
            remaining_sleep(hour, Duration::from_secs(25)),
            Duration::from_secs(3575)
        );
        assert_eq!(remaining_sleep(hour, hour), Duration::ZERO);
        assert_eq!(
            remaining_sleep(hour, Duration::from_secs(4000)),
            Duration::ZERO
        );
        assert_eq!(
            remaining_sleep(hour, Duration::from_millis(1500)),
            Duration::from_millis(3_598_500)
        );
    }

    #[test]
    fn test_observation_without_photo() {
        let record = CycleRecord {
            cycle: 1,
            elapsed: Duration::from_secs(21),
            sleep: Duration::from_secs(3579),
            ..CycleRecord::default()
        };
        let observation = record.observation();
        assert!(!observation.photo_taken);
        assert!(!observation.tagged);
        assert!(observation.upload.is_none());
        assert!(!record.uploaded());
    }
}
