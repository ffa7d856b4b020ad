//! Integration tests for node startup when the broker is down
//!
//! The node must not give up: connect times out, the event loop keeps
//! retrying in the background, and the sensor is still armed.


use pir_motion_node::config::MqttSection;
use pir_motion_node::node::{run_node, MotionNode};
use pir_motion_node::protocol::WHO_TOPIC;
use pir_motion_node::sensor::PinLevel;
use pir_motion_node::testing::MockGpio;
use pir_motion_node::transport::mqtt::{BusLifecycle, ConnectionState, MqttClient, MqttError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use test_helpers::{test_config, UNREACHABLE_BROKER};

#[tokio::test]
async fn test_connect_times_out_when_broker_unavailable() {
    let config = MqttSection {
        broker_url: UNREACHABLE_BROKER.to_string(),
        username_env: None,
        password_env: None,
        keep_alive_secs: 60,
        connect_timeout_secs: 1,
    };
    let lifecycle = Arc::new(BusLifecycle::new(vec![WHO_TOPIC.to_string()]));
    let mut client = MqttClient::new("pir-startup-test", &config, lifecycle.clone())
        .expect("Client creation should succeed even if broker is down");

    let start = Instant::now();
    let result = client.connect().await;

    assert!(matches!(result, Err(MqttError::ConnectTimeout(_))));
    assert!(start.elapsed() >= Duration::from_secs(1));
    assert_eq!(lifecycle.state(), ConnectionState::Disconnected);
    // Never connected, so nothing was lost
    assert!(!lifecycle.disconnect_pending());

    client.shutdown().await;
}

#[tokio::test]
async fn test_node_arms_sensor_without_broker() {
    let gpio = MockGpio::new();
    let mut node = MotionNode::new(test_config(), gpio.clone()).unwrap();

    node.start().await.unwrap();

    assert!(node.sensor().is_enabled());
    gpio.drive(PinLevel::High);
    assert!(node.sensor().has_pending_event());

    node.shutdown().await;
}

#[tokio::test]
async fn test_missing_hardware_is_fatal() {
    let result = run_node(test_config(), MockGpio::unavailable()).await;

    let error = result.expect_err("startup must fail without GPIO");
    assert!(error.is_hardware_failure());
}

#[tokio::test]
async fn test_startup_delay_precedes_arming() {
    let mut config = test_config();
    config.sensor.startup_delay_ms = 200;
    let gpio = MockGpio::new();
    let mut node = MotionNode::new(config, gpio.clone()).unwrap();

    let start = Instant::now();
    node.start().await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(1200));
    assert!(gpio.has_callback());
    node.shutdown().await;
}
