//! Motion publishing loop
//!
//! Consumes debounced transitions from the sensor and publishes each one,
//! retained and at-least-once, to the node's location topic. Publishing does
//! not wait for the broker: while disconnected, requests queue in the
//! client and go out after reconnect.

use crate::protocol::{MotionMessage, Topic};
use crate::sensor::{GpioBackend, MotionSample, MotionSensor, SensorError};
use crate::transport::{BusClient, MqttError};
use tracing::{info, warn};

/// Publishes motion transitions for one location
pub struct MotionPublisher<C: BusClient> {
    client: C,
    topic: Topic,
    published: u64,
}

impl<C: BusClient> MotionPublisher<C> {
    pub fn new(client: C, topic: Topic) -> Self {
        Self {
            client,
            topic,
            published: 0,
        }
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Number of transitions handed to the bus successfully
    pub fn published_count(&self) -> u64 {
        self.published
    }

    /// Publish a single transition
    pub async fn publish_sample(&mut self, sample: MotionSample) -> Result<(), MqttError> {
        let message = MotionMessage::from_sample(&self.topic, sample);

        self.client
            .publish(
                &message.topic,
                message.payload.as_bytes().to_vec(),
                message.retain,
            )
            .await?;

        self.published += 1;
        info!(
            topic = %message.topic,
            payload = message.payload,
            level = %sample.level(),
            "Motion state published"
        );
        Ok(())
    }

    /// Wait for transitions forever, publishing each in order.
    ///
    /// A failed publish is logged and the loop carries on with the next
    /// transition. Returns only when the sensor's event source closes.
    pub async fn run<B: GpioBackend>(
        &mut self,
        sensor: &mut MotionSensor<B>,
    ) -> Result<(), SensorError> {
        info!(topic = %self.topic, pin = sensor.pin(), "Motion publisher running");

        loop {
            let sample = sensor.wait_for_event().await?;
            if let Err(e) = self.publish_sample(sample).await {
                warn!(error = %e, level = %sample.level(), "Failed to publish motion state");
            }
        }
    }
}
