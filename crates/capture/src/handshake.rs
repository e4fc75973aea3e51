//! LedHandshake - light on, expose, restore
//!
//! Sequence per call:
//!
//! ```text
//! publish "1" -> settle -> capture -> settle -> publish "true"/"false"
//! ```
//!
//! The restore value is the LED state reported by the sensor at the start
//! of the call. Publish and capture failures are logged; the sequence
//! always runs to the end.

use std::sync::Arc;
use std::time::Duration;

use contracts::{BusConfig, BusPublisher, Camera, DeliveryGuarantee, PhotoCapture};
use ingestion::SensorChannel;
use observability::record_led_command;
use tracing::{debug, info, instrument, warn};

use crate::capturer::Capturer;

/// Payload switching the LED on for the exposure
pub const LED_ON_COMMAND: &str = "1";

/// Payload restoring the sensor-reported state; unset counts as off
pub fn restore_command(led_on: Option<bool>) -> &'static str {
    if led_on.unwrap_or(false) {
        "true"
    } else {
        "false"
    }
}

pub struct LedHandshake<P> {
    bus: P,
    channel: Arc<SensorChannel>,
    control_topic: String,
    guarantee: DeliveryGuarantee,
    settle: Duration,
}

impl<P: BusPublisher> LedHandshake<P> {
    pub fn new(
        bus: P,
        channel: Arc<SensorChannel>,
        control_topic: impl Into<String>,
        settle: Duration,
    ) -> Self {
        Self {
            bus,
            channel,
            control_topic: control_topic.into(),
            guarantee: DeliveryGuarantee::default(),
            settle,
        }
    }

    /// Build from the bus section of the agent config
    pub fn from_config(
        bus: P,
        channel: Arc<SensorChannel>,
        config: &BusConfig,
        settle: Duration,
    ) -> Self {
        Self::new(bus, channel, &config.control_topic, settle).with_guarantee(config.control_qos)
    }

    pub fn with_guarantee(mut self, guarantee: DeliveryGuarantee) -> Self {
        self.guarantee = guarantee;
        self
    }

    pub fn bus(&self) -> &P {
        &self.bus
    }

    pub fn control_topic(&self) -> &str {
        &self.control_topic
    }

    /// Run the full light/capture/restore sequence
    ///
    /// Returns the photo, or `None` when the capture failed.
    #[instrument(
        name = "led_handshake",
        skip(self, capturer),
        fields(topic = %self.control_topic, settle_secs = self.settle.as_secs())
    )]
    pub async fn toggle_and_capture<C: Camera>(
        &self,
        capturer: &Capturer<C>,
    ) -> Option<PhotoCapture> {
        let restore = restore_command(self.channel.current_led_state());

        self.send(LED_ON_COMMAND).await;
        tokio::time::sleep(self.settle).await;

        let photo = match capturer.take_photo().await {
            Ok(photo) => Some(photo),
            Err(e) => {
                warn!(error = %e, "No photo this cycle");
                None
            }
        };

        tokio::time::sleep(self.settle).await;
        self.send(restore).await;

        photo
    }

    async fn send(&self, command: &str) {
        match self
            .bus
            .publish(&self.control_topic, command, self.guarantee)
            .await
        {
            Ok(()) => {
                record_led_command(command, true);
                info!(topic = %self.control_topic, command, "Sent LED command");
            }
            Err(e) => {
                record_led_command(command, false);
                warn!(
                    topic = %self.control_topic,
                    command,
                    error = %e,
                    "LED command not sent"
                );
            }
        }
        debug!(guarantee = ?self.guarantee, "LED command done");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockCamera;
    use contracts::{Resolution, SensorReading};
    use ingestion::{journal_entries, Journal, RecordingBus};
    use tempfile::tempdir;
    use tokio::time::Instant;

    fn setup(journal: &Journal) -> (LedHandshake<RecordingBus>, Arc<SensorChannel>) {
        let channel = Arc::new(SensorChannel::new());
        let handshake = LedHandshake::new(
            RecordingBus::with_journal(journal.clone()),
            Arc::clone(&channel),
            "input_led",
            Duration::from_secs(10),
        );
        (handshake, channel)
    }

    #[test]
    fn test_restore_command() {
        assert_eq!(restore_command(Some(true)), "true");
        assert_eq!(restore_command(Some(false)), "false");
        assert_eq!(restore_command(None), "false");
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_before_capture_restore_after() {
        let journal = Journal::default();
        let (handshake, channel) = setup(&journal);
        channel.update(SensorReading::new(r#"{"ledOn":true}"#, Some(true)));

        let dir = tempdir().unwrap();
        let capturer = Capturer::new(
            MockCamera::with_journal(journal.clone()),
            Resolution::new(16, 16),
            dir.path(),
        );

        let start = Instant::now();
        let photo = handshake.toggle_and_capture(&capturer).await;

        assert!(photo.is_some());
        assert_eq!(
            journal_entries(&journal),
            vec!["publish:1", "capture", "publish:true"]
        );
        assert_eq!(start.elapsed(), Duration::from_secs(20));

        let published = handshake.bus().published();
        assert!(published.iter().all(|m| m.topic == "input_led"));
        assert!(published
            .iter()
            .all(|m| m.guarantee == DeliveryGuarantee::ExactlyOnce));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_failure_still_restores() {
        let journal = Journal::default();
        let (handshake, _channel) = setup(&journal);

        let dir = tempdir().unwrap();
        let camera = MockCamera::with_journal(journal.clone());
        camera.set_failing(true);
        let capturer = Capturer::new(camera, Resolution::new(16, 16), dir.path());

        let photo = handshake.toggle_and_capture(&capturer).await;

        assert!(photo.is_none());
        assert_eq!(
            journal_entries(&journal),
            vec!["publish:1", "capture-failed", "publish:false"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_failure_does_not_abort() {
        let journal = Journal::default();
        let (handshake, _channel) = setup(&journal);
        handshake.bus().set_failing(true);

        let dir = tempdir().unwrap();
        let capturer = Capturer::new(
            MockCamera::with_journal(journal.clone()),
            Resolution::new(16, 16),
            dir.path(),
        );

        let photo = handshake.toggle_and_capture(&capturer).await;

        assert!(photo.is_some());
        assert_eq!(
            journal_entries(&journal),
            vec!["publish-failed:1", "capture", "publish-failed:false"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_uses_state_at_call_start() {
        let journal = Journal::default();
        let (handshake, channel) = setup(&journal);
        channel.update(SensorReading::new(r#"{"ledOn":false}"#, Some(false)));

        let dir = tempdir().unwrap();
        let capturer = Capturer::new(MockCamera::new(), Resolution::new(16, 16), dir.path());

        let run = handshake.toggle_and_capture(&capturer);
        let flip = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            channel.update(SensorReading::new(r#"{"ledOn":true}"#, Some(true)));
        };
        let (photo, ()) = tokio::join!(run, flip);

        assert!(photo.is_some());
        assert_eq!(handshake.bus().payloads(), vec!["1", "false"]);
    }
}
