//! SensorChannel - latest sensor reading shared between the two tasks
//!
//! Single writer (bus subscriber), single reader (capture cycle). The
//! payload and the LED flag derived from it live in one snapshot so a
//! reader never sees one without the other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use contracts::{ReadingError, SensorReading};

/// Holder of the most recent [`SensorReading`]
#[derive(Debug, Default)]
pub struct SensorChannel {
    latest: RwLock<Option<SensorReading>>,
    updates: AtomicU64,
}

impl SensorChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored reading
    pub fn update(&self, reading: SensorReading) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(reading);
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Decode a raw bus payload and store it
    ///
    /// Malformed payloads leave the stored reading untouched.
    pub fn apply_message(&self, payload: &[u8]) -> Result<(), ReadingError> {
        let reading = SensorReading::parse(payload)?;
        self.update(reading);
        Ok(())
    }

    /// Latest reading, None before the first message
    pub fn snapshot(&self) -> Option<SensorReading> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Raw text of the latest reading
    pub fn current_payload(&self) -> Option<Arc<str>> {
        self.snapshot().map(|r| r.raw_shared())
    }

    /// LED desired state of the latest reading
    ///
    /// None both before the first message and when the latest message had no
    /// boolean `ledOn` field.
    pub fn current_led_state(&self) -> Option<bool> {
        self.snapshot().and_then(|r| r.led_on())
    }

    /// Number of readings stored so far
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_before_first_message() {
        let channel = SensorChannel::new();
        assert!(channel.current_payload().is_none());
        assert!(channel.current_led_state().is_none());
        assert_eq!(channel.update_count(), 0);
    }

    #[test]
    fn test_read_after_write() {
        let channel = SensorChannel::new();
        for (payload, expected) in [
            (r#"{"ledOn": true}"#, Some(true)),
            (r#"{"ledOn": false, "lux": 120}"#, Some(false)),
            (r#"{"lux": 80}"#, None),
            (r#"{"ledOn": true}"#, Some(true)),
        ] {
            channel.apply_message(payload.as_bytes()).unwrap();
            assert_eq!(channel.current_led_state(), expected);
            assert_eq!(channel.current_payload().as_deref(), Some(payload));
        }
        assert_eq!(channel.update_count(), 4);
    }

    #[test]
    fn test_malformed_leaves_last_good_value() {
        let channel = SensorChannel::new();
        channel.apply_message(br#"{"ledOn": true}"#).unwrap();

        assert!(channel.apply_message(b"not json").is_err());
        assert!(channel.apply_message(&[0xc3, 0x28]).is_err());
        assert!(channel.apply_message(b"17").is_err());

        assert_eq!(channel.current_led_state(), Some(true));
        assert_eq!(channel.current_payload().as_deref(), Some(r#"{"ledOn": true}"#));
        assert_eq!(channel.update_count(), 1);
    }

    #[test]
    fn test_concurrent_reader_never_sees_torn_snapshot() {
        let channel = Arc::new(SensorChannel::new());
        let writer = {
            let channel = Arc::clone(&channel);
            std::thread::spawn(move || {
                for i in 0..1000 {
                    let on = i % 2 == 0;
                    let payload = format!(r#"{{"ledOn": {on}, "seq": {i}}}"#);
                    channel.apply_message(payload.as_bytes()).unwrap();
                }
            })
        };

        for _ in 0..1000 {
            if let Some(reading) = channel.snapshot() {
                let expected = reading.raw().contains("\"ledOn\": true");
                assert_eq!(reading.led_on(), Some(expected));
            }
        }
        writer.join().unwrap();
        assert_eq!(channel.update_count(), 1000);
    }
}
