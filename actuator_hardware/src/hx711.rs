//! Bit-banged HX711 load-cell ADC driver.
//!
//! The HX711 is not a standard bus: DT falls when a conversion is ready, then
//! the host clocks 24 data bits out MSB first on SCK, followed by 1 to 3 extra
//! pulses that select gain and channel for the *next* conversion.
use std::sync::Arc;
use std::time::Duration;

use actuator_traits::{BoxError, InterruptGate, SampleSource};
use tracing::trace;

use crate::error::Result;
use crate::util::{spin_for, wait_until_low_with_timeout};

/// Data bits per conversion.
const DATA_BITS: u32 = 24;
/// MSB of the 24-bit word; flipping it maps the two's-complement output to offset binary.
const MSB: u32 = 0x80_0000;
/// Default SCK high/low hold.
pub const DEFAULT_BIT_DELAY: Duration = Duration::from_micros(20);
/// Default interval between data-ready polls.
pub const DEFAULT_READY_POLL: Duration = Duration::from_micros(500);

/// The two HX711 lines as seen by the host.
pub trait SensorBus {
    /// Level of DT; high means "conversion not ready" while idle.
    fn data_is_high(&mut self) -> bool;
    fn set_clock_high(&mut self);
    fn set_clock_low(&mut self);
}

/// Gain/channel for the next conversion, selected by the trailing pulse count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gain {
    /// Channel A, gain 128.
    #[default]
    A128,
    /// Channel B, gain 32.
    B32,
    /// Channel A, gain 64.
    A64,
}

impl Gain {
    pub fn extra_pulses(self) -> u8 {
        match self {
            Gain::A128 => 1,
            Gain::B32 => 2,
            Gain::A64 => 3,
        }
    }
}

pub struct Hx711<B: SensorBus> {
    bus: B,
    gain: Gain,
    bit_delay: Duration,
    ready_poll: Duration,
    gate: Arc<InterruptGate>,
}

impl<B: SensorBus> Hx711<B> {
    pub fn new(mut bus: B, gate: Arc<InterruptGate>) -> Self {
        bus.set_clock_low(); // clock idle low
        Self {
            bus,
            gain: Gain::default(),
            bit_delay: DEFAULT_BIT_DELAY,
            ready_poll: DEFAULT_READY_POLL,
            gate,
        }
    }

    pub fn with_gain(mut self, gain: Gain) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_bit_delay(mut self, bit_delay: Duration) -> Self {
        self.bit_delay = bit_delay;
        self
    }

    pub fn with_ready_poll(mut self, ready_poll: Duration) -> Self {
        self.ready_poll = ready_poll;
        self
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Read one raw 24-bit sample, waiting at most `timeout` for data-ready.
    pub fn read_with_timeout(&mut self, timeout: Duration) -> Result<u32> {
        let Self {
            bus,
            gain,
            bit_delay,
            ready_poll,
            gate,
        } = self;

        wait_until_low_with_timeout(|| bus.data_is_high(), timeout, *ready_poll)?;

        let delay = *bit_delay;
        let pulses = gain.extra_pulses();
        let value = gate.critical(|| {
            let mut value: u32 = 0;
            for _ in 0..DATA_BITS {
                bus.set_clock_high();
                spin_for(delay);
                value = (value << 1) | u32::from(bus.data_is_high());
                bus.set_clock_low();
                spin_for(delay);
            }
            for _ in 0..pulses {
                bus.set_clock_high();
                spin_for(delay);
                bus.set_clock_low();
                spin_for(delay);
            }
            value ^ MSB
        });

        trace!(raw = value, "hx711 raw read");
        Ok(value)
    }
}

impl<B: SensorBus> SampleSource for Hx711<B> {
    fn read_sample(&mut self, timeout: Duration) -> std::result::Result<u32, BoxError> {
        self.read_with_timeout(timeout).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HwError;

    /// Bus that shifts out a fixed 24-bit word and counts clock pulses.
    struct WordBus {
        word: u32,
        bit: u32,
        pulses: u32,
        ready_after_polls: u32,
        clock_high: bool,
    }

    impl WordBus {
        fn new(word: u32) -> Self {
            Self {
                word,
                bit: 0,
                pulses: 0,
                ready_after_polls: 0,
                clock_high: false,
            }
        }
    }

    impl SensorBus for WordBus {
        fn data_is_high(&mut self) -> bool {
            if !self.clock_high {
                // DT as a ready flag between transfers
                if self.ready_after_polls > 0 {
                    self.ready_after_polls -= 1;
                    return true;
                }
                return false;
            }
            let shift = DATA_BITS - 1 - self.bit;
            (self.word >> shift) & 1 == 1
        }
        fn set_clock_high(&mut self) {
            self.clock_high = true;
            self.pulses += 1;
        }
        fn set_clock_low(&mut self) {
            if self.clock_high && self.bit < DATA_BITS {
                self.bit += 1;
            }
            self.clock_high = false;
        }
    }

    fn driver(bus: WordBus) -> Hx711<WordBus> {
        Hx711::new(bus, Arc::new(InterruptGate::new()))
            .with_bit_delay(Duration::ZERO)
            .with_ready_poll(Duration::from_micros(10))
    }

    #[test]
    fn clocks_msb_first_and_flips_top_bit() {
        let mut hx = driver(WordBus::new(0x12_3456));
        let v = hx.read_with_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(v, 0x12_3456 ^ 0x80_0000);
        assert_eq!(hx.bus().pulses, 25, "24 data bits + 1 gain pulse");
    }

    #[test]
    fn gain_selects_trailing_pulse_count() {
        let mut hx = driver(WordBus::new(0)).with_gain(Gain::A64);
        let _ = hx.read_with_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(hx.bus().pulses, 27);
    }

    #[test]
    fn waits_for_data_ready() {
        let mut bus = WordBus::new(0x7F_FFFF);
        bus.ready_after_polls = 3;
        let mut hx = driver(bus);
        let v = hx.read_with_timeout(Duration::from_millis(50)).unwrap();
        assert_eq!(v, 0xFF_FFFF);
    }

    #[test]
    fn times_out_when_never_ready() {
        let mut bus = WordBus::new(0);
        bus.ready_after_polls = u32::MAX;
        let mut hx = driver(bus);
        let err = hx.read_with_timeout(Duration::from_millis(2)).unwrap_err();
        assert!(matches!(err, HwError::DataReadyTimeout));
        assert_eq!(hx.bus().pulses, 0, "no clocking without data-ready");
    }
}
