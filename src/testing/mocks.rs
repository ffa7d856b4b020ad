//! Mock implementations for testing
//!
//! Provides a mock GPIO backend that lets tests drive the pin level and fire
//! interrupts by hand, and a mock bus that records publishes and
//! subscriptions.

use crate::sensor::{DigitalInput, EdgeCallback, GpioBackend, PinLevel, PullMode, SensorError};
use crate::transport::{BusClient, MqttError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// A recorded publish: topic, payload and retain flag
pub type PublishedMessage = (String, Vec<u8>, bool);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct PinState {
    level: PinLevel,
    scripted: VecDeque<PinLevel>,
    fail_next_reads: usize,
    configured: Option<(u8, PullMode)>,
}

#[derive(Default)]
struct MockGpioShared {
    pin: Mutex<PinState>,
    // Kept apart from the pin state: the callback reads the pin while running
    callback: Mutex<Option<EdgeCallback>>,
}

/// Mock GPIO backend; clones share the same pin
#[derive(Clone)]
pub struct MockGpio {
    shared: Arc<MockGpioShared>,
    available: bool,
    interrupts: bool,
}

impl Default for MockGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGpio {
    pub fn new() -> Self {
        Self {
            shared: Arc::default(),
            available: true,
            interrupts: true,
        }
    }

    /// Backend whose `configure` always fails, as on a non-Pi host
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Backend whose pins cannot deliver interrupts
    pub fn without_interrupts() -> Self {
        Self {
            interrupts: false,
            ..Self::new()
        }
    }

    /// Pin and pull mode passed to the last successful `configure`
    pub fn configured(&self) -> Option<(u8, PullMode)> {
        lock(&self.shared.pin).configured
    }

    /// Set the level every subsequent read returns
    pub fn set_level(&self, level: PinLevel) {
        lock(&self.shared.pin).level = level;
    }

    /// Queue levels returned by the next reads, one per read
    pub fn script_levels<I: IntoIterator<Item = PinLevel>>(&self, levels: I) {
        lock(&self.shared.pin).scripted.extend(levels);
    }

    /// Make the next read fail
    pub fn fail_next_read(&self) {
        lock(&self.shared.pin).fail_next_reads += 1;
    }

    /// True once a rising-edge callback has been armed
    pub fn has_callback(&self) -> bool {
        lock(&self.shared.callback).is_some()
    }

    /// Simulate one rising-edge interrupt. Returns false if nothing is armed.
    pub fn fire_rising_edge(&self) -> bool {
        let mut callback = lock(&self.shared.callback);
        match callback.as_mut() {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Set the level, then fire a rising edge
    pub fn drive(&self, level: PinLevel) -> bool {
        self.set_level(level);
        self.fire_rising_edge()
    }
}

impl GpioBackend for MockGpio {
    type Input = MockInput;

    fn configure(&self, pin: u8, pull: PullMode) -> Result<Self::Input, SensorError> {
        if !self.available {
            return Err(SensorError::hardware_unavailable(format!(
                "mock GPIO {pin} unavailable"
            )));
        }

        lock(&self.shared.pin).configured = Some((pin, pull));

        Ok(MockInput {
            pin,
            shared: self.shared.clone(),
            interrupts: self.interrupts,
        })
    }
}

/// Input pin handed out by [`MockGpio`]
pub struct MockInput {
    pin: u8,
    shared: Arc<MockGpioShared>,
    interrupts: bool,
}

impl DigitalInput for MockInput {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn read(&self) -> Result<PinLevel, SensorError> {
        let mut state = lock(&self.shared.pin);

        if state.fail_next_reads > 0 {
            state.fail_next_reads -= 1;
            return Err(SensorError::hardware_unavailable("mock read failure"));
        }

        Ok(state.scripted.pop_front().unwrap_or(state.level))
    }

    fn register_rising_edge_callback(&self, callback: EdgeCallback) -> Result<(), SensorError> {
        if !self.interrupts {
            return Err(SensorError::hardware_unavailable(format!(
                "mock GPIO {} has no interrupt support",
                self.pin
            )));
        }

        *lock(&self.shared.callback) = Some(callback);
        Ok(())
    }

    fn clear_rising_edge_callback(&self) -> Result<(), SensorError> {
        lock(&self.shared.callback).take();
        Ok(())
    }
}

/// Mock bus for testing
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    published: Arc<Mutex<Vec<PublishedMessage>>>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    should_fail: bool,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus whose every publish and subscribe fails
    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        lock(&self.published).clone()
    }

    /// Payloads published so far, as strings
    pub fn published_payloads(&self) -> Vec<String> {
        lock(&self.published)
            .iter()
            .map(|(_, payload, _)| String::from_utf8_lossy(payload).to_string())
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        lock(&self.subscriptions).clone()
    }

    pub fn clear_history(&self) {
        lock(&self.published).clear();
        lock(&self.subscriptions).clear();
    }
}

#[async_trait]
impl BusClient for MockBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), MqttError> {
        if self.should_fail {
            return Err(MqttError::PublishFailed("mock publish failure".into()));
        }
        lock(&self.published).push((topic.to_string(), payload, retain));
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), MqttError> {
        if self.should_fail {
            return Err(MqttError::SubscriptionFailed("mock subscribe failure".into()));
        }
        lock(&self.subscriptions).push(topic.to_string());
        Ok(())
    }
}
