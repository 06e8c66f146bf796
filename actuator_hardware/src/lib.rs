//! Hardware backends for the actuator controller.
//!
//! - [`hx711`]: the bit-banged load-cell driver, generic over [`hx711::SensorBus`].
//! - [`rpi`]: `rppal` GPIO/PWM bindings (feature `hardware`, Linux only).
//! - Simulated load cell and PWM channels for running without a board.
pub mod error;
pub mod hx711;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod rpi;
pub mod util;

use actuator_traits::{BoxError, PwmChannel, SampleSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

/// Reads in one press cycle of the simulated load cell.
const PRESS_CYCLE_READS: u32 = 40;
/// Reads at rest before the simulated press starts ramping.
const REST_READS: u32 = 20;
/// Force added per read while the simulated press ramps.
const RAMP_STEP: u32 = 4_000;

/// Simulated HX711: a fixture at rest, then a steadily increasing press,
/// repeating every 40 reads.
pub struct SimulatedLoadCell {
    rest: u32,
    reads: u32,
}

impl SimulatedLoadCell {
    /// `rest` is the raw reading with nothing pressing on the cell.
    pub fn new(rest: u32) -> Self {
        Self { rest, reads: 0 }
    }
}

impl SampleSource for SimulatedLoadCell {
    fn read_sample(&mut self, _timeout: Duration) -> Result<u32, BoxError> {
        let phase = self.reads % PRESS_CYCLE_READS;
        self.reads = self.reads.wrapping_add(1);
        let press = phase.saturating_sub(REST_READS - 1) * RAMP_STEP;
        let raw = self.rest.saturating_add(press) & 0xFF_FFFF;
        tracing::debug!(raw, "load cell (simulated)");
        Ok(raw)
    }
}

/// Simulated PWM channel. The committed duty lives in a shared register so
/// tests and the CLI can observe it; `writes` counts commits.
#[derive(Clone)]
pub struct SimulatedPwm {
    name: &'static str,
    max_duty: u32,
    pending: u32,
    register: Arc<AtomicU32>,
    writes: Arc<AtomicUsize>,
}

impl SimulatedPwm {
    pub fn new(name: &'static str, resolution_bits: u8) -> Self {
        Self {
            name,
            max_duty: (1u32 << resolution_bits.min(31)) - 1,
            pending: 0,
            register: Arc::new(AtomicU32::new(0)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn committed(&self) -> u32 {
        self.register.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl PwmChannel for SimulatedPwm {
    fn duty(&self) -> Result<u32, BoxError> {
        Ok(self.register.load(Ordering::Relaxed))
    }

    fn write_duty(&mut self, duty: u32) -> Result<(), BoxError> {
        if duty > self.max_duty {
            return Err(format!("{}: duty {duty} exceeds {}", self.name, self.max_duty).into());
        }
        self.pending = duty;
        Ok(())
    }

    fn update(&mut self) -> Result<(), BoxError> {
        self.register.store(self.pending, Ordering::Relaxed);
        self.writes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(channel = self.name, duty = self.pending, "pwm commit (simulated)");
        Ok(())
    }

    fn max_duty(&self) -> u32 {
        self.max_duty
    }
}
