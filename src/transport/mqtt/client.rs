//! Impure I/O operations for the MQTT client
//!
//! This module owns the rumqttc client and its event loop. A spawned task
//! polls the event loop forever, fires the lifecycle callbacks and backs off
//! between failed polls; rumqttc reconnects on the next poll after an error.

use super::connection::{configure_mqtt_options, ConnectionState, MqttError, ReconnectConfig};
use super::lifecycle::BusLifecycle;
use super::message_handler::{EventRoute, MessageHandler};
use crate::config::MqttSection;
use crate::transport::BusClient;
use async_trait::async_trait;
use rumqttc::v5::{mqttbytes::QoS, AsyncClient, EventLoop};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

/// Capacity of the rumqttc request channel
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Cloneable publish/subscribe handle onto the shared rumqttc client
#[derive(Clone)]
pub struct MqttHandle {
    client: AsyncClient,
}

#[async_trait]
impl BusClient for MqttHandle {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), MqttError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload)
            .await
            .map_err(|e| MqttError::PublishFailed(Box::new(e)))
    }

    async fn subscribe(&self, topic: &str) -> Result<(), MqttError> {
        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| MqttError::SubscriptionFailed(Box::new(e)))
    }
}

/// MQTT client for the motion node
pub struct MqttClient {
    client_id: String,
    handle: MqttHandle,
    event_loop: Option<EventLoop>,
    lifecycle: Arc<BusLifecycle>,
    reconnect_config: ReconnectConfig,
    connect_timeout: Duration,
    event_loop_handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<watch::Sender<bool>>,
}

impl MqttClient {
    pub fn new(
        client_id: &str,
        config: &MqttSection,
        lifecycle: Arc<BusLifecycle>,
    ) -> Result<Self, MqttError> {
        let mqtt_options = configure_mqtt_options(client_id, config)?;
        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CHANNEL_CAPACITY);

        Ok(Self {
            client_id: client_id.to_string(),
            handle: MqttHandle { client },
            event_loop: Some(event_loop),
            lifecycle,
            reconnect_config: ReconnectConfig::default(),
            connect_timeout: config.connect_timeout(),
            event_loop_handle: None,
            shutdown_tx: None,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Handle for publishing from other tasks
    pub fn handle(&self) -> MqttHandle {
        self.handle.clone()
    }

    pub fn lifecycle(&self) -> &Arc<BusLifecycle> {
        &self.lifecycle
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    /// Start the event loop and wait for the first ConnAck.
    ///
    /// On `ConnectTimeout` the event loop keeps running and retrying; callers
    /// may carry on and let publishes queue up.
    pub async fn connect(&mut self) -> Result<(), MqttError> {
        let event_loop = self.event_loop.take().ok_or(MqttError::EventLoopStopped)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);

        info!(client_id = %self.client_id, "Starting MQTT event loop");
        let handle = tokio::spawn(
            Self::run_event_loop(
                event_loop,
                self.handle.clone(),
                self.lifecycle.clone(),
                self.reconnect_config.clone(),
                shutdown_rx,
            )
            .instrument(crate::mqtt_span!(client_id = %self.client_id)),
        );
        self.event_loop_handle = Some(handle);

        Self::wait_for_connection_confirmation(self.lifecycle.watch_state(), self.connect_timeout)
            .await
    }

    /// Wait until the lifecycle reports `Connected`
    async fn wait_for_connection_confirmation(
        mut state_rx: watch::Receiver<ConnectionState>,
        timeout: Duration,
    ) -> Result<(), MqttError> {
        let wait = async {
            loop {
                if *state_rx.borrow_and_update() == ConnectionState::Connected {
                    return Ok(());
                }
                if state_rx.changed().await.is_err() {
                    return Err(MqttError::EventLoopStopped);
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(MqttError::ConnectTimeout(timeout)),
        }
    }

    async fn run_event_loop(
        mut event_loop: EventLoop,
        handle: MqttHandle,
        lifecycle: Arc<BusLifecycle>,
        reconnect_config: ReconnectConfig,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut failures = 0u32;

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping MQTT event loop");
                        break;
                    }
                }
                event = event_loop.poll() => match event {
                    Ok(event) => {
                        let route = MessageHandler::route_mqtt_event(&event);
                        if Self::process_event_route(route, &lifecycle, &handle) {
                            failures = 0;
                        }
                    }
                    Err(e) => {
                        Self::process_poll_error(&lifecycle, &e.to_string());

                        failures = failures.saturating_add(1);
                        let delay = reconnect_config.calculate_backoff_delay(failures);
                        info!(attempt = failures, delay_ms = delay.as_millis() as u64, "Reconnecting to MQTT broker");
                        if !Self::interruptible_sleep(shutdown_rx.clone(), delay).await {
                            break;
                        }
                    }
                }
            }
        }

        info!("MQTT event loop stopped");
    }

    /// Act on a routed event. Returns true when a ConnAck was processed.
    ///
    /// The connected state is recorded inline, in poll order. Resubscribing
    /// runs in its own task so that a full request channel can never stall
    /// the event loop that drains it.
    pub(crate) fn process_event_route<C>(
        route: EventRoute,
        lifecycle: &Arc<BusLifecycle>,
        client: &C,
    ) -> bool
    where
        C: BusClient + Clone + 'static,
    {
        match route {
            EventRoute::ConnectionAcknowledged => {
                lifecycle.mark_connected();
                let lifecycle = lifecycle.clone();
                let client = client.clone();
                tokio::spawn(async move {
                    lifecycle.resubscribe(&client).await;
                });
                true
            }
            EventRoute::Disconnected => {
                lifecycle.on_disconnect("broker sent DISCONNECT");
                false
            }
            EventRoute::MessageReceived {
                topic,
                payload,
                retain,
            } => {
                MessageHandler::log_incoming(&topic, &payload, retain);
                false
            }
            EventRoute::SubscriptionConfirmed { packet_id } => {
                debug!(target: "mqtt_transport", packet_id, "Subscription confirmed");
                false
            }
            EventRoute::InfrastructureEvent(event) => {
                debug!(target: "mqtt_transport", "MQTT event: {}", event);
                false
            }
            EventRoute::OutgoingEvent => false,
        }
    }

    /// A failed poll loses the connection if there was one
    pub(crate) fn process_poll_error(lifecycle: &BusLifecycle, error: &str) {
        if lifecycle.is_connected() {
            lifecycle.on_disconnect(error);
        } else {
            debug!(error, "MQTT connection attempt failed");
        }
    }

    /// Sleep unless shutdown is requested first; returns false on shutdown
    async fn interruptible_sleep(mut shutdown_rx: watch::Receiver<bool>, delay: Duration) -> bool {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                changed.is_ok() && !*shutdown_rx.borrow()
            }
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Stop the event loop and disconnect
    pub async fn shutdown(&mut self) {
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(true);
        }

        if let Err(e) = self.handle.client.disconnect().await {
            debug!(error = %e, "Disconnect request not sent");
        }

        if let Some(handle) = self.event_loop_handle.take() {
            match tokio::time::timeout(Duration::from_secs(2), handle).await {
                Ok(Ok(())) => info!("MQTT event loop shut down gracefully"),
                Ok(Err(e)) if !e.is_cancelled() => warn!("MQTT event loop ended with error: {}", e),
                Err(_) => warn!("MQTT event loop didn't shut down gracefully, aborting"),
                _ => {}
            }
        }
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(true);
        }
        if let Some(handle) = self.event_loop_handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::WHO_TOPIC;
    use crate::testing::MockBus;

    fn test_mqtt_config() -> MqttSection {
        MqttSection {
            broker_url: "mqtt://localhost:1883".to_string(),
            username_env: None,
            password_env: None,
            keep_alive_secs: 60,
            connect_timeout_secs: 1,
        }
    }

    fn test_lifecycle() -> Arc<BusLifecycle> {
        Arc::new(BusLifecycle::new(vec![WHO_TOPIC.to_string()]))
    }

    #[tokio::test]
    async fn test_wait_for_connection_confirmation_success() {
        let lifecycle = test_lifecycle();
        let rx = lifecycle.watch_state();

        let bus = MockBus::new();
        let connecting = lifecycle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            connecting.on_connect(&bus).await;
        });

        let result =
            MqttClient::wait_for_connection_confirmation(rx, Duration::from_millis(500)).await;
        assert!(result.is_ok(), "Should see the ConnAck");
    }

    #[tokio::test]
    async fn test_wait_for_connection_confirmation_timeout() {
        let lifecycle = test_lifecycle();
        let rx = lifecycle.watch_state();

        let result =
            MqttClient::wait_for_connection_confirmation(rx, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(MqttError::ConnectTimeout(_))));
    }

    #[tokio::test]
    async fn test_interruptible_sleep_completes() {
        let (_tx, rx) = watch::channel(false);
        assert!(MqttClient::interruptible_sleep(rx, Duration::from_millis(5)).await);
    }

    #[tokio::test]
    async fn test_interruptible_sleep_interrupted() {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let _ = tx.send(true);
        });

        assert!(!MqttClient::interruptible_sleep(rx, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_connack_route_resubscribes() {
        let lifecycle = test_lifecycle();
        let bus = MockBus::new();

        assert!(MqttClient::process_event_route(
            EventRoute::ConnectionAcknowledged,
            &lifecycle,
            &bus
        ));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(lifecycle.is_connected());
        assert_eq!(bus.subscriptions(), vec![WHO_TOPIC.to_string()]);
    }

    #[tokio::test]
    async fn test_poll_error_right_after_connack_records_disconnect() {
        let lifecycle = test_lifecycle();
        let bus = MockBus::new();

        MqttClient::process_event_route(EventRoute::ConnectionAcknowledged, &lifecycle, &bus);
        // Connection drops before the resubscribe task gets to run
        MqttClient::process_poll_error(&lifecycle, "connection reset by peer");
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(lifecycle.state(), ConnectionState::Disconnected);
        assert!(lifecycle.disconnect_pending());
        assert_eq!(lifecycle.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_poll_error_while_disconnected_is_not_a_disconnect() {
        let lifecycle = test_lifecycle();

        MqttClient::process_poll_error(&lifecycle, "connection refused");

        assert_eq!(lifecycle.state(), ConnectionState::Disconnected);
        assert!(!lifecycle.disconnect_pending());
    }

    #[tokio::test]
    async fn test_connack_marks_connected_before_resubscribe_runs() {
        let lifecycle = test_lifecycle();
        let bus = MockBus::new();

        MqttClient::process_event_route(EventRoute::ConnectionAcknowledged, &lifecycle, &bus);

        assert!(lifecycle.is_connected());
        assert!(bus.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_route_marks_pending() {
        let lifecycle = test_lifecycle();
        let bus = MockBus::new();

        assert!(!MqttClient::process_event_route(
            EventRoute::Disconnected,
            &lifecycle,
            &bus
        ));
        assert!(lifecycle.disconnect_pending());
        assert_eq!(lifecycle.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_client_creation_not_connected() {
        let client = MqttClient::new("pir-test", &test_mqtt_config(), test_lifecycle()).unwrap();
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
        assert_eq!(client.client_id(), "pir-test");
    }

    #[tokio::test]
    async fn test_client_creation_invalid_url() {
        let mut config = test_mqtt_config();
        config.broker_url = "ftp://localhost".to_string();

        let result = MqttClient::new("pir-test", &config, test_lifecycle());
        assert!(matches!(result, Err(MqttError::InvalidBrokerUrl(_))));
    }

    #[tokio::test]
    async fn test_connect_twice_fails() {
        let mut config = test_mqtt_config();
        // Nothing listens on port 1 so the first connect times out
        config.broker_url = "mqtt://127.0.0.1:1".to_string();
        let mut client = MqttClient::new("pir-test", &config, test_lifecycle()).unwrap();

        assert!(matches!(
            client.connect().await,
            Err(MqttError::ConnectTimeout(_))
        ));
        assert!(matches!(
            client.connect().await,
            Err(MqttError::EventLoopStopped)
        ));
        client.shutdown().await;
    }
}
