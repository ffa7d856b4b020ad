//! Pure routing of rumqttc events
//!
//! The event loop maps every polled event to an [`EventRoute`] and acts on
//! the route, which keeps the decision logic testable without a broker.

use crate::protocol::{parse_motion_payload, WHO_TOPIC};
use rumqttc::v5::mqttbytes::v5::Packet;
use rumqttc::v5::Event;
use tracing::debug;

/// Pure message routing decisions based on MQTT events
pub struct MessageHandler;

impl MessageHandler {
    /// Route MQTT event to appropriate handler (pure routing decision)
    pub fn route_mqtt_event(event: &Event) -> EventRoute {
        match event {
            Event::Incoming(incoming) => match incoming {
                Packet::ConnAck(_) => EventRoute::ConnectionAcknowledged,
                Packet::Publish(publish) => EventRoute::MessageReceived {
                    topic: String::from_utf8_lossy(&publish.topic).to_string(),
                    payload: publish.payload.to_vec(),
                    retain: publish.retain,
                },
                Packet::Disconnect(_) => EventRoute::Disconnected,
                Packet::SubAck(suback) => EventRoute::SubscriptionConfirmed {
                    packet_id: suback.pkid,
                },
                other => EventRoute::InfrastructureEvent(format!("{other:?}")),
            },
            Event::Outgoing(_) => EventRoute::OutgoingEvent,
        }
    }

    /// Log an incoming message. The node does not act on received messages.
    pub fn log_incoming(topic: &str, payload: &[u8], retain: bool) {
        if topic == WHO_TOPIC {
            debug!(topic, retain, "Who query received");
        } else if let Some(level) = parse_motion_payload(payload) {
            debug!(topic, %level, retain, "Motion message received");
        } else {
            debug!(topic, bytes = payload.len(), retain, "Message received");
        }
    }
}

/// Routing decisions for MQTT events
#[derive(Debug, Clone, PartialEq)]
pub enum EventRoute {
    /// Connection (or reconnection) acknowledged
    ConnectionAcknowledged,
    /// Message received on a subscribed topic
    MessageReceived {
        topic: String,
        payload: Vec<u8>,
        retain: bool,
    },
    /// Broker sent DISCONNECT
    Disconnected,
    /// Subscription confirmed
    SubscriptionConfirmed { packet_id: u16 },
    /// Infrastructure event (PingResp, PubAck, ...)
    InfrastructureEvent(String),
    /// Outgoing event (handled automatically)
    OutgoingEvent,
}
