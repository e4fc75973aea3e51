//! BusSubscriber - keeps SensorChannel fed from the sensor topic

use std::sync::Arc;
use std::time::Duration;

use observability::{record_bus_connection_error, record_bus_message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::channel::SensorChannel;
use crate::connection::{BusConnection, BusEvent};

/// What happened to one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Stored in the channel
    Applied,
    /// Arrived on a topic other than the sensor topic
    Ignored,
    /// Undecodable or not JSON; channel untouched
    Rejected,
}

/// Counters for one subscriber run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberStats {
    pub connects: u64,
    pub messages_applied: u64,
    pub messages_ignored: u64,
    pub messages_rejected: u64,
    pub connection_errors: u64,
}

/// Sensor topic subscriber
pub struct BusSubscriber {
    topic: String,
    channel: Arc<SensorChannel>,
    reconnect_delay: Duration,
}

impl BusSubscriber {
    pub fn new(topic: impl Into<String>, channel: Arc<SensorChannel>) -> Self {
        Self {
            topic: topic.into(),
            channel,
            reconnect_delay: Duration::from_secs(5),
        }
    }

    /// Pause after a connection error before polling again
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Receive loop
    ///
    /// Runs until `shutdown` is cancelled. Nothing inside the loop is fatal:
    /// malformed messages are dropped and connection errors are retried.
    #[instrument(name = "bus_subscriber_run", skip_all, fields(topic = %self.topic))]
    pub async fn run<C: BusConnection>(
        &self,
        connection: &mut C,
        shutdown: CancellationToken,
    ) -> SubscriberStats {
        let mut stats = SubscriberStats::default();
        info!("Bus subscriber started");

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = connection.next_event() => event,
            };

            match event {
                Ok(BusEvent::Connected) => {
                    stats.connects += 1;
                    info!(connects = stats.connects, "Connected to bus, subscribing");
                    if let Err(e) = connection.subscribe(&self.topic) {
                        error!(error = %e, "Subscribe request failed");
                    }
                }
                Ok(BusEvent::Message { topic, payload }) => {
                    match self.handle_message(&topic, &payload) {
                        MessageOutcome::Applied => stats.messages_applied += 1,
                        MessageOutcome::Ignored => stats.messages_ignored += 1,
                        MessageOutcome::Rejected => stats.messages_rejected += 1,
                    }
                }
                Ok(BusEvent::Other) => {}
                Err(e) => {
                    stats.connection_errors += 1;
                    record_bus_connection_error();
                    warn!(
                        error = %e,
                        retry_in_secs = self.reconnect_delay.as_secs_f64(),
                        "Bus connection error"
                    );
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.reconnect_delay) => {}
                    }
                }
            }
        }

        connection.disconnect().await;
        info!(
            applied = stats.messages_applied,
            rejected = stats.messages_rejected,
            connection_errors = stats.connection_errors,
            "Bus subscriber stopped"
        );
        stats
    }

    /// Decode one message and store it in the channel
    pub fn handle_message(&self, topic: &str, payload: &[u8]) -> MessageOutcome {
        if topic != self.topic {
            debug!(topic = %topic, "Message on unexpected topic ignored");
            return MessageOutcome::Ignored;
        }

        match self.channel.apply_message(payload) {
            Ok(()) => {
                record_bus_message(true);
                debug!(
                    bytes = payload.len(),
                    led_on = ?self.channel.current_led_state(),
                    "Sensor reading updated"
                );
                MessageOutcome::Applied
            }
            Err(e) => {
                record_bus_message(false);
                warn!(error = %e, bytes = payload.len(), "Malformed sensor payload discarded");
                MessageOutcome::Rejected
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedConnection;
    use contracts::BusError;

    fn message(topic: &str, payload: &[u8]) -> Result<BusEvent, BusError> {
        Ok(BusEvent::Message {
            topic: topic.to_string(),
            payload: bytes::Bytes::copy_from_slice(payload),
        })
    }

    #[test]
    fn test_handle_message_outcomes() {
        let channel = Arc::new(SensorChannel::new());
        let subscriber = BusSubscriber::new("sensors", Arc::clone(&channel));

        assert_eq!(
            subscriber.handle_message("sensors", br#"{"ledOn": true}"#),
            MessageOutcome::Applied
        );
        assert_eq!(
            subscriber.handle_message("other", br#"{"ledOn": false}"#),
            MessageOutcome::Ignored
        );
        assert_eq!(
            subscriber.handle_message("sensors", b"garbage"),
            MessageOutcome::Rejected
        );
        assert_eq!(channel.current_led_state(), Some(true));
    }

    #[tokio::test]
    async fn test_malformed_message_does_not_stop_loop() {
        let channel = Arc::new(SensorChannel::new());
        let subscriber = BusSubscriber::new("sensors", Arc::clone(&channel));
        let shutdown = CancellationToken::new();

        let mut connection = ScriptedConnection::new(vec![
            Ok(BusEvent::Connected),
            message("sensors", br#"{"ledOn": false}"#),
            message("sensors", &[0xff, 0x00, 0xfe]),
            message("sensors", b"{not json"),
            message("sensors", br#"{"ledOn": true, "lux": 3}"#),
        ])
        .cancel_when_drained(shutdown.clone());

        let stats = subscriber.run(&mut connection, shutdown).await;

        assert_eq!(stats.connects, 1);
        assert_eq!(stats.messages_applied, 2);
        assert_eq!(stats.messages_rejected, 2);
        assert_eq!(channel.current_led_state(), Some(true));
        assert_eq!(
            channel.current_payload().as_deref(),
            Some(r#"{"ledOn": true, "lux": 3}"#)
        );
        assert_eq!(connection.subscriptions(), vec!["sensors".to_string()]);
        assert!(connection.is_disconnected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubscribes_after_reconnect() {
        let channel = Arc::new(SensorChannel::new());
        let subscriber = BusSubscriber::new("sensors", Arc::clone(&channel))
            .with_reconnect_delay(Duration::from_secs(5));
        let shutdown = CancellationToken::new();

        let mut connection = ScriptedConnection::new(vec![
            Ok(BusEvent::Connected),
            Err(BusError::Disconnected {
                message: "connection reset".to_string(),
            }),
            Ok(BusEvent::Connected),
            message("sensors", br#"{"ledOn": false}"#),
        ])
        .cancel_when_drained(shutdown.clone());

        let stats = subscriber.run(&mut connection, shutdown).await;

        assert_eq!(stats.connects, 2);
        assert_eq!(stats.connection_errors, 1);
        assert_eq!(connection.subscriptions().len(), 2);
        assert_eq!(channel.current_led_state(), Some(false));
    }

    #[tokio::test]
    async fn test_cancel_stops_idle_loop() {
        let channel = Arc::new(SensorChannel::new());
        let subscriber = BusSubscriber::new("sensors", channel);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let mut connection = ScriptedConnection::new(Vec::new());
        let stats = subscriber.run(&mut connection, shutdown).await;
        assert_eq!(stats, SubscriberStats::default());
        assert!(connection.is_disconnected());
    }
}
