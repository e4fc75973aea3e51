//! # Ingestion
//!
//! Message bus side of the capture agent.
//!
//! Responsibilities:
//! - Hold the latest sensor reading (`SensorChannel`)
//! - Subscribe to the sensor topic and feed the channel (`BusSubscriber`)
//! - Provide the MQTT publish handle used for LED commands (`MqttBus`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{BusSubscriber, MqttBus, SensorChannel};
//!
//! let channel = Arc::new(SensorChannel::new());
//! let (bus, mut connection) = MqttBus::open(&config.bus);
//! let subscriber = BusSubscriber::new(&config.bus.sensor_topic, Arc::clone(&channel));
//! tokio::spawn(async move { subscriber.run(&mut connection, shutdown).await });
//! ```

mod channel;
mod connection;
mod mock;
mod mqtt;
mod subscriber;

// Re-exports
pub use channel::SensorChannel;
pub use connection::{BusConnection, BusEvent};
pub use contracts::{BusPublisher, SensorReading};
pub use mock::{
    journal_entries, journal_push, Journal, PublishedMessage, RecordingBus, ScriptedConnection,
};
pub use mqtt::{mqtt_options, MqttBus, MqttConnection};
pub use subscriber::{BusSubscriber, MessageOutcome, SubscriberStats};
