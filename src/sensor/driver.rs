//! Motion sensor driver
//!
//! Bridges interrupt-context sampling to application-context consumption.
//! The rising-edge callback reads the pin and enqueues a sample only when the
//! level differs from the last one observed, so the queue carries transitions
//! and never repeated levels, however often the interrupt fires.

use super::input::{DigitalInput, GpioBackend, PullMode};
use super::level::{MotionSample, PinLevel};
use super::queue::{EventQueue, QueueConsumer, QueueProducer};
use super::SensorError;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Level-change debouncer run once per interrupt firing.
///
/// Owned by the edge callback; nothing else reads `last_level`.
#[derive(Debug)]
pub struct EdgeSampler {
    last_level: PinLevel,
    producer: QueueProducer,
}

impl EdgeSampler {
    pub fn new(producer: QueueProducer) -> Self {
        Self {
            last_level: PinLevel::Low,
            producer,
        }
    }

    pub fn last_level(&self) -> PinLevel {
        self.last_level
    }

    /// Apply one pin reading. Returns the sample that was enqueued, if any.
    ///
    /// A failed read leaves `last_level` untouched and enqueues nothing.
    pub fn on_edge(&mut self, reading: Result<PinLevel, SensorError>) -> Option<MotionSample> {
        let level = match reading {
            Ok(level) => level,
            Err(e) => {
                warn!(error = %e, "PIR read failed in interrupt handler, sample skipped");
                return None;
            }
        };

        let sample = if level != self.last_level {
            let sample = MotionSample::new(level);
            self.producer.push(sample);
            debug!(from = %self.last_level, to = %level, "PIR transition queued");
            Some(sample)
        } else {
            None
        };

        self.last_level = level;
        sample
    }
}

/// PIR motion sensor on a single GPIO pin
pub struct MotionSensor<B: GpioBackend> {
    backend: B,
    pin: u8,
    input: Option<Arc<B::Input>>,
    producer: Option<QueueProducer>,
    consumer: QueueConsumer,
}

impl<B: GpioBackend> MotionSensor<B> {
    pub fn new(backend: B, pin: u8) -> Self {
        let (producer, consumer) = EventQueue::channel();
        Self {
            backend,
            pin,
            input: None,
            producer: Some(producer),
            consumer,
        }
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn is_enabled(&self) -> bool {
        self.input.is_some()
    }

    /// Claim the pin (pull-down) and arm the rising-edge callback
    pub fn enable(&mut self) -> Result<(), SensorError> {
        if self.input.is_some() || self.producer.is_none() {
            return Err(SensorError::AlreadyEnabled);
        }

        let _span = crate::sensor_span!(pin = self.pin).entered();
        let input = Arc::new(self.backend.configure(self.pin, PullMode::Down)?);
        let producer = self.producer.take().ok_or(SensorError::AlreadyEnabled)?;

        let reader = Arc::downgrade(&input);
        let mut sampler = EdgeSampler::new(producer);
        input.register_rising_edge_callback(Box::new(move || {
            // Input dropped means the sensor is being torn down
            if let Some(input) = reader.upgrade() {
                sampler.on_edge(input.read());
            }
        }))?;

        info!(pin = self.pin, "PIR motion sensor enabled");
        self.input = Some(input);
        Ok(())
    }

    /// True iff a transition is waiting; does not dequeue
    pub fn has_pending_event(&self) -> bool {
        !self.consumer.is_empty()
    }

    /// Dequeue one transition without waiting
    pub fn next_event_nonblocking(&mut self) -> Result<MotionSample, SensorError> {
        self.consumer.try_pop().ok_or(SensorError::QueueEmpty)
    }

    /// Suspend until a transition is available, then return it
    pub async fn wait_for_event(&mut self) -> Result<MotionSample, SensorError> {
        self.consumer
            .pop_blocking()
            .await
            .ok_or(SensorError::EventSourceClosed)
    }
}

impl<B: GpioBackend> Drop for MotionSensor<B> {
    /// Disarm the interrupt before releasing the pin, so the last `Arc` to
    /// the input is dropped here and never on the interrupt thread.
    fn drop(&mut self) {
        let Some(input) = self.input.take() else {
            return;
        };

        if let Err(e) = input.clear_rising_edge_callback() {
            warn!(pin = self.pin, error = %e, "Failed to disarm PIR interrupt");
        }
        debug!(pin = self.pin, "PIR motion sensor released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGpio;

    fn sampler() -> (EdgeSampler, QueueConsumer) {
        let (producer, consumer) = EventQueue::channel();
        (EdgeSampler::new(producer), consumer)
    }

    #[test]
    fn test_sampler_starts_low() {
        let (sampler, _consumer) = sampler();
        assert_eq!(sampler.last_level(), PinLevel::Low);
    }

    #[test]
    fn test_sampler_suppresses_repeats() {
        let (mut sampler, mut consumer) = sampler();

        assert_eq!(sampler.on_edge(Ok(PinLevel::Low)), None);
        assert!(sampler.on_edge(Ok(PinLevel::High)).is_some());
        assert_eq!(sampler.on_edge(Ok(PinLevel::High)), None);
        assert_eq!(sampler.on_edge(Ok(PinLevel::High)), None);

        assert_eq!(consumer.len(), 1);
        assert_eq!(consumer.try_pop(), Some(MotionSample::new(PinLevel::High)));
    }

    #[test]
    fn test_sampler_read_failure_keeps_last_level() {
        let (mut sampler, consumer) = sampler();
        sampler.on_edge(Ok(PinLevel::High));

        let result = sampler.on_edge(Err(SensorError::hardware_unavailable("read failed")));

        assert_eq!(result, None);
        assert_eq!(sampler.last_level(), PinLevel::High);
        assert_eq!(consumer.len(), 1);
    }

    #[test]
    fn test_enable_twice_is_rejected() {
        let gpio = MockGpio::new();
        let mut sensor = MotionSensor::new(gpio, 17);

        assert!(sensor.enable().is_ok());
        assert!(sensor.is_enabled());
        assert!(matches!(sensor.enable(), Err(SensorError::AlreadyEnabled)));
    }

    #[test]
    fn test_enable_fails_without_hardware() {
        let gpio = MockGpio::unavailable();
        let mut sensor = MotionSensor::new(gpio, 17);

        let result = sensor.enable();
        assert!(matches!(
            result,
            Err(SensorError::HardwareUnavailable { .. })
        ));
        assert!(!sensor.is_enabled());
    }

    #[test]
    fn test_enable_fails_without_interrupt_support() {
        let gpio = MockGpio::without_interrupts();
        let mut sensor = MotionSensor::new(gpio, 17);

        assert!(matches!(
            sensor.enable(),
            Err(SensorError::HardwareUnavailable { .. })
        ));
    }

    #[test]
    fn test_enable_configures_pull_down() {
        let gpio = MockGpio::new();
        let mut sensor = MotionSensor::new(gpio.clone(), 4);
        sensor.enable().unwrap();

        assert_eq!(gpio.configured(), Some((4, PullMode::Down)));
    }

    #[test]
    fn test_next_event_nonblocking_empty() {
        let gpio = MockGpio::new();
        let mut sensor = MotionSensor::new(gpio, 17);
        sensor.enable().unwrap();

        assert!(!sensor.has_pending_event());
        assert!(matches!(
            sensor.next_event_nonblocking(),
            Err(SensorError::QueueEmpty)
        ));
    }

    #[test]
    fn test_has_pending_event_does_not_dequeue() {
        let gpio = MockGpio::new();
        let mut sensor = MotionSensor::new(gpio.clone(), 17);
        sensor.enable().unwrap();

        gpio.set_level(PinLevel::High);
        gpio.fire_rising_edge();

        assert!(sensor.has_pending_event());
        assert!(sensor.has_pending_event());
        assert_eq!(
            sensor.next_event_nonblocking().unwrap().level(),
            PinLevel::High
        );
        assert!(!sensor.has_pending_event());
    }

    #[test]
    fn test_drop_disarms_interrupt() {
        let gpio = MockGpio::new();
        let mut sensor = MotionSensor::new(gpio.clone(), 17);
        sensor.enable().unwrap();
        assert!(gpio.has_callback());

        drop(sensor);

        assert!(!gpio.has_callback());
        assert!(!gpio.drive(PinLevel::High));
    }

    #[test]
    fn test_drop_without_enable_is_quiet() {
        let gpio = MockGpio::new();
        let sensor = MotionSensor::new(gpio.clone(), 17);

        drop(sensor);

        assert!(!gpio.has_callback());
        assert_eq!(gpio.configured(), None);
    }
}
