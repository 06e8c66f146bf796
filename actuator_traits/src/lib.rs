//! Seams between the actuator control core and the hardware it drives.
//!
//! Everything the core touches on the board goes through one of these traits,
//! so the same control code runs against `rppal` peripherals, the simulated
//! backend, and test spies.
pub mod clock;
pub mod irq;

pub use clock::{Clock, MonotonicClock};
pub use irq::{EncoderPin, InterruptGate, Notifier, NotifyWaiter, Wait, notification};

use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Source of raw 24-bit load-cell samples.
pub trait SampleSource {
    /// Block until one sample is available or `timeout` expires.
    fn read_sample(&mut self, timeout: Duration) -> Result<u32, BoxError>;
}

/// One PWM output. The duty is read back from the peripheral, not cached.
pub trait PwmChannel {
    fn duty(&self) -> Result<u32, BoxError>;
    /// Stage a new duty value; it takes effect on `update()`.
    fn write_duty(&mut self, duty: u32) -> Result<(), BoxError>;
    /// Commit the staged duty to the output.
    fn update(&mut self) -> Result<(), BoxError>;
    /// Largest accepted duty (`2^resolution - 1`).
    fn max_duty(&self) -> u32;
}

/// A motor behind an H-bridge: two directions plus coast.
pub trait HBridge {
    fn drive_forward(&mut self, duty: u32) -> Result<(), BoxError>;
    fn drive_reverse(&mut self, duty: u32) -> Result<(), BoxError>;
    fn coast(&mut self) -> Result<(), BoxError>;
    fn max_duty(&self) -> u32;
}

/// Current logic level of a digital input.
pub trait LevelInput {
    fn is_high(&self) -> bool;
}

/// End-of-travel signal consumed by the saturate phase.
pub trait EndStop {
    /// Drop any trigger that arrived before the caller started waiting.
    fn clear(&mut self);
    /// Wait up to `timeout`; `true` if the end stop fired.
    fn wait(&mut self, timeout: Duration) -> bool;
}

impl<T: SampleSource + ?Sized> SampleSource for Box<T> {
    fn read_sample(&mut self, timeout: Duration) -> Result<u32, BoxError> {
        (**self).read_sample(timeout)
    }
}

impl<T: HBridge + ?Sized> HBridge for Box<T> {
    fn drive_forward(&mut self, duty: u32) -> Result<(), BoxError> {
        (**self).drive_forward(duty)
    }
    fn drive_reverse(&mut self, duty: u32) -> Result<(), BoxError> {
        (**self).drive_reverse(duty)
    }
    fn coast(&mut self) -> Result<(), BoxError> {
        (**self).coast()
    }
    fn max_duty(&self) -> u32 {
        (**self).max_duty()
    }
}

impl<T: LevelInput + ?Sized> LevelInput for Box<T> {
    fn is_high(&self) -> bool {
        (**self).is_high()
    }
}

impl<T: EndStop + ?Sized> EndStop for Box<T> {
    fn clear(&mut self) {
        (**self).clear();
    }
    fn wait(&mut self, timeout: Duration) -> bool {
        (**self).wait(timeout)
    }
}

impl EndStop for NotifyWaiter<()> {
    fn clear(&mut self) {
        NotifyWaiter::clear(self);
    }

    fn wait(&mut self, timeout: Duration) -> bool {
        self.wait_timeout(timeout).is_some()
    }
}
