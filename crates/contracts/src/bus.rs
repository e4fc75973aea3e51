//! BusPublisher trait - outbound side of the message bus
//!
//! The LED handshake publishes through this trait so it can run against the
//! real MQTT client or a recording mock.

use serde::{Deserialize, Serialize};

use crate::BusError;

/// Acknowledgement level requested for a published message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryGuarantee {
    /// Fire and forget (QoS 0)
    AtMostOnce,
    /// Broker acknowledges, duplicates possible (QoS 1)
    AtLeastOnce,
    /// Four-way handshake, no duplicates (QoS 2)
    #[default]
    ExactlyOnce,
}

/// Outbound publish interface
#[trait_variant::make(BusPublisher: Send)]
pub trait LocalBusPublisher {
    /// Publish a UTF-8 payload to `topic`
    ///
    /// Returning `Ok` means the client accepted the message for delivery, not
    /// that the remote device acted on it.
    async fn publish(
        &self,
        topic: &str,
        payload: &str,
        guarantee: DeliveryGuarantee,
    ) -> Result<(), BusError>;
}
