//! BusConnection trait - inbound side of the message bus
//!
//! Abstracts the client event loop so the subscriber can be driven by the
//! real MQTT connection or by a scripted sequence in tests.

use std::future::Future;

use bytes::Bytes;
use contracts::BusError;

/// Event surfaced by a bus connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// Session (re)established; subscriptions must be renewed
    Connected,
    /// Application message
    Message { topic: String, payload: Bytes },
    /// Protocol traffic the subscriber does not care about
    Other,
}

/// Long-lived bus connection
///
/// Reconnection is the implementation's business: after an error, calling
/// [`next_event`](BusConnection::next_event) again is expected to retry.
pub trait BusConnection: Send {
    /// Wait for the next event
    fn next_event(&mut self) -> impl Future<Output = Result<BusEvent, BusError>> + Send;

    /// Request a subscription to `topic`
    fn subscribe(&mut self, topic: &str) -> Result<(), BusError>;

    /// Best-effort clean disconnect
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;
}
