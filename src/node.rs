//! Motion node lifecycle
//!
//! Startup order:
//!
//! 1. Compose the publish topic from the configured location
//! 2. Start the MQTT client and wait (bounded) for the first ConnAck
//! 3. Let the PIR output settle for the configured startup delay
//! 4. Claim the GPIO pin and arm the rising-edge interrupt
//!
//! After startup the node runs the publishing loop until the event source
//! closes or the caller stops polling it (signal handling lives in the
//! binary), then shuts the client down.

use crate::config::NodeConfig;
use crate::error::NodeResult;
use crate::protocol::{Topic, WHO_TOPIC};
use crate::publisher::MotionPublisher;
use crate::sensor::{GpioBackend, MotionSensor};
use crate::transport::mqtt::{build_client_id, BusLifecycle, MqttClient, MqttError, MqttHandle};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A running motion node: one sensor, one broker connection
pub struct MotionNode<B: GpioBackend> {
    config: NodeConfig,
    topic: Topic,
    client: MqttClient,
    sensor: MotionSensor<B>,
    publisher: MotionPublisher<MqttHandle>,
}

impl<B: GpioBackend> MotionNode<B> {
    /// Build the node without touching the network or the hardware
    pub fn new(config: NodeConfig, backend: B) -> NodeResult<Self> {
        let topic = config.topic()?;
        let lifecycle = Arc::new(BusLifecycle::new(vec![WHO_TOPIC.to_string()]));
        let client_id = build_client_id(topic.as_str());
        let client = MqttClient::new(&client_id, &config.mqtt, lifecycle)?;
        let publisher = MotionPublisher::new(client.handle(), topic.clone());
        let sensor = MotionSensor::new(backend, config.sensor.pin);

        Ok(Self {
            config,
            topic,
            client,
            sensor,
            publisher,
        })
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn lifecycle(&self) -> &Arc<BusLifecycle> {
        self.client.lifecycle()
    }

    pub fn sensor(&self) -> &MotionSensor<B> {
        &self.sensor
    }

    /// Connect, settle, then arm the sensor.
    ///
    /// A broker that does not answer in time is not fatal: the event loop
    /// keeps retrying and publishes queue until it connects. GPIO failures
    /// are fatal.
    #[instrument(skip(self), fields(topic = %self.topic, pin = self.config.sensor.pin))]
    pub async fn start(&mut self) -> NodeResult<()> {
        info!(broker = %self.config.mqtt.broker_url, "Starting motion node");

        match self.client.connect().await {
            Ok(()) => info!("Broker connection established"),
            Err(MqttError::ConnectTimeout(timeout)) => warn!(
                timeout_secs = timeout.as_secs(),
                "Broker not reachable yet, continuing and retrying in the background"
            ),
            Err(e) => return Err(e.into()),
        }

        let delay = self.config.sensor.startup_delay();
        if !delay.is_zero() {
            info!(delay_ms = delay.as_millis() as u64, "Waiting for PIR output to settle");
            tokio::time::sleep(delay).await;
        }

        self.sensor.enable()?;
        Ok(())
    }

    /// Publish transitions until the event source closes
    pub async fn run(&mut self) -> NodeResult<()> {
        self.publisher.run(&mut self.sensor).await?;
        Ok(())
    }

    /// Stop the MQTT event loop and disconnect
    pub async fn shutdown(&mut self) {
        info!(
            published = self.publisher.published_count(),
            "Shutting down motion node"
        );
        self.client.shutdown().await;
    }
}

/// Start the node and run it until it fails
pub async fn run_node<B: GpioBackend>(config: NodeConfig, backend: B) -> NodeResult<()> {
    let mut node = MotionNode::new(config, backend)?;

    let result = match node.start().await {
        Ok(()) => node.run().await,
        Err(e) => Err(e),
    };

    node.shutdown().await;
    result
}
