//! MQTT transport (rumqttc)
//!
//! [`MqttBus`] is the publish handle used by the LED handshake;
//! [`MqttConnection`] owns the event loop polled by the subscriber task.
//! Both share one client, so publishes ride on the subscriber's connection.

use std::time::Duration;

use contracts::{BusConfig, BusError, BusPublisher, DeliveryGuarantee};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, Transport};
use tracing::{debug, instrument};

use crate::connection::{BusConnection, BusEvent};

/// Request queue depth between client handles and the event loop
const REQUEST_CAPACITY: usize = 32;

/// Time allowed for the DISCONNECT packet to go out
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

fn qos(guarantee: DeliveryGuarantee) -> QoS {
    match guarantee {
        DeliveryGuarantee::AtMostOnce => QoS::AtMostOnce,
        DeliveryGuarantee::AtLeastOnce => QoS::AtLeastOnce,
        DeliveryGuarantee::ExactlyOnce => QoS::ExactlyOnce,
    }
}

/// Build client options from config
pub fn mqtt_options(config: &BusConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(config.keep_alive());

    if let Some(username) = &config.username {
        options.set_credentials(username, config.password.as_deref().unwrap_or_default());
    }
    if config.tls {
        options.set_transport(Transport::tls_with_default_config());
    }
    options
}

/// Publish handle
#[derive(Clone)]
pub struct MqttBus {
    client: AsyncClient,
}

impl MqttBus {
    /// Create the client pair
    ///
    /// No network traffic happens until the returned connection is polled.
    pub fn open(config: &BusConfig) -> (Self, MqttConnection) {
        let (client, eventloop) = AsyncClient::new(mqtt_options(config), REQUEST_CAPACITY);
        debug!(host = %config.host, port = config.port, tls = config.tls, "MQTT client created");
        (
            Self {
                client: client.clone(),
            },
            MqttConnection { client, eventloop },
        )
    }
}

impl BusPublisher for MqttBus {
    #[instrument(name = "mqtt_publish", skip(self), fields(topic = %topic, payload = %payload))]
    async fn publish(
        &self,
        topic: &str,
        payload: &str,
        guarantee: DeliveryGuarantee,
    ) -> Result<(), BusError> {
        // try_publish never blocks the capture cycle when the event loop is
        // stuck reconnecting and the request queue is full
        self.client
            .try_publish(topic, qos(guarantee), false, payload.as_bytes().to_vec())
            .map_err(|e| BusError::publish(topic, e.to_string()))
    }
}

/// Event loop side of the client
pub struct MqttConnection {
    client: AsyncClient,
    eventloop: EventLoop,
}

impl BusConnection for MqttConnection {
    async fn next_event(&mut self) -> Result<BusEvent, BusError> {
        match self.eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => Ok(BusEvent::Connected),
            Ok(Event::Incoming(Packet::Publish(publish))) => Ok(BusEvent::Message {
                topic: publish.topic,
                payload: publish.payload,
            }),
            Ok(_) => Ok(BusEvent::Other),
            Err(e) => Err(BusError::Disconnected {
                message: e.to_string(),
            }),
        }
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), BusError> {
        self.client
            .try_subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| BusError::Subscribe {
                topic: topic.to_string(),
                message: e.to_string(),
            })
    }

    async fn disconnect(&mut self) {
        if self.client.try_disconnect().is_err() {
            return;
        }
        let drain = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(DISCONNECT_GRACE, drain).await.is_err() {
            debug!("MQTT disconnect not flushed before grace period");
        }
    }
}
