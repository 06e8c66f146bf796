#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the actuator controller.
//!
//! `Config` and its sections are deserialized from TOML and checked with
//! [`Config::validate`]. Only `[pins]` is mandatory; every other section falls
//! back to the values the controller was tuned with.
use serde::Deserialize;

/// GPIO and PWM assignments.
///
/// The encoder, proximity and button inputs are optional; leaving one out
/// disables the feature it drives.
#[derive(Debug, Deserialize)]
pub struct Pins {
    pub hx711_dt: u8,
    pub hx711_sck: u8,
    /// PWM channel (0 or 1) wired to the H-bridge forward input.
    pub motor_ina: u8,
    /// PWM channel (0 or 1) wired to the H-bridge reverse input.
    pub motor_inb: u8,
    pub encoder_a: Option<u8>,
    pub encoder_b: Option<u8>,
    pub button: Option<u8>,
    pub proximity: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PwmCfg {
    /// Low frequencies give smoother slow motion on brushed actuators.
    pub frequency_hz: f64,
    pub resolution_bits: u8,
}

impl Default for PwmCfg {
    fn default() -> Self {
        Self {
            frequency_hz: 60.0,
            resolution_bits: 10,
        }
    }
}

/// Force bands, in raw counts net of tare.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BandsCfg {
    pub dead: i32,
    pub creep_threshold: i32,
    pub creep_duty: u32,
    pub saturate_threshold: i32,
    pub saturate_duty: u32,
}

impl Default for BandsCfg {
    fn default() -> Self {
        Self {
            dead: 10_000,
            creep_threshold: 10_000,
            creep_duty: 1 << 5,
            saturate_threshold: 25_000,
            saturate_duty: 1023,
        }
    }
}

/// Phase timing. The saturate timeout and nominal reverse time are
/// `periods * period_ms`, scaled by the user adjust factor.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimingCfg {
    /// Time for one actuator screw rotation at full duty.
    pub period_ms: u64,
    pub forward_saturate_periods: u32,
    pub reverse_periods: u32,
    pub creep_settle_ms: u64,
    pub creep_poll_ms: u64,
    pub idle_poll_ms: u64,
    /// Coast between forward and reverse; avoids a supply brownout.
    pub coast_forward_ms: u64,
    pub coast_reverse_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            period_ms: 39,
            forward_saturate_periods: 8,
            reverse_periods: 10,
            creep_settle_ms: 500,
            creep_poll_ms: 28,
            idle_poll_ms: 75,
            coast_forward_ms: 100,
            coast_reverse_ms: 400,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TareCfg {
    /// Raw reading treated as zero before the tare offset is applied.
    pub reference: u32,
    pub samples: u32,
    pub settle_ms: u64,
}

impl Default for TareCfg {
    fn default() -> Self {
        Self {
            reference: 8_000_000,
            samples: 10,
            settle_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Hardware {
    /// Max time to wait for HX711 data-ready (DT low) before failing.
    pub sensor_read_timeout_ms: u64,
    /// SCK high/low hold per bit, microseconds.
    pub bit_delay_us: u64,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            sensor_read_timeout_ms: 1000,
            bit_delay_us: 20,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub pwm: PwmCfg,
    #[serde(default)]
    pub bands: BandsCfg,
    #[serde(default)]
    pub timing: TimingCfg,
    #[serde(default)]
    pub tare: TareCfg,
    #[serde(default)]
    pub hardware: Hardware,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if self.pins.motor_ina > 1 || self.pins.motor_inb > 1 {
            eyre::bail!("pins.motor_ina/motor_inb must be PWM channel 0 or 1");
        }
        if self.pins.motor_ina == self.pins.motor_inb {
            eyre::bail!("pins.motor_ina and pins.motor_inb must be different channels");
        }
        if self.pins.hx711_dt == self.pins.hx711_sck {
            eyre::bail!("pins.hx711_dt and pins.hx711_sck must be different pins");
        }
        if self.pins.encoder_a.is_some() != self.pins.encoder_b.is_some() {
            eyre::bail!("pins.encoder_a and pins.encoder_b must be set together");
        }

        // PWM
        if !(self.pwm.frequency_hz.is_finite() && self.pwm.frequency_hz > 0.0) {
            eyre::bail!("pwm.frequency_hz must be > 0");
        }
        if !(1..=20).contains(&self.pwm.resolution_bits) {
            eyre::bail!("pwm.resolution_bits must be in 1..=20");
        }
        let max_duty = (1u32 << self.pwm.resolution_bits) - 1;

        // Bands
        let b = &self.bands;
        if b.dead < 0 {
            eyre::bail!("bands.dead must be >= 0");
        }
        if b.dead >= b.saturate_threshold {
            eyre::bail!("bands.dead must be < bands.saturate_threshold");
        }
        if b.creep_threshold > b.saturate_threshold {
            eyre::bail!("bands.creep_threshold must be <= bands.saturate_threshold");
        }
        if b.creep_duty == 0 {
            eyre::bail!("bands.creep_duty must be > 0");
        }
        if b.creep_duty > b.saturate_duty {
            eyre::bail!("bands.creep_duty must be <= bands.saturate_duty");
        }
        if b.saturate_duty > max_duty {
            eyre::bail!("bands.saturate_duty must be <= {max_duty} (2^pwm.resolution_bits - 1)");
        }

        // Timing
        let t = &self.timing;
        if t.period_ms == 0 {
            eyre::bail!("timing.period_ms must be >= 1");
        }
        if t.forward_saturate_periods == 0 {
            eyre::bail!("timing.forward_saturate_periods must be >= 1");
        }
        if t.reverse_periods == 0 {
            eyre::bail!("timing.reverse_periods must be >= 1");
        }
        if t.creep_poll_ms == 0 || t.idle_poll_ms == 0 {
            eyre::bail!("timing.creep_poll_ms and timing.idle_poll_ms must be >= 1");
        }

        // Tare
        if self.tare.samples == 0 {
            eyre::bail!("tare.samples must be >= 1");
        }
        if self.tare.reference > 0xFF_FFFF {
            eyre::bail!("tare.reference must fit in 24 bits");
        }

        // Hardware
        if self.hardware.sensor_read_timeout_ms == 0 {
            eyre::bail!("hardware.sensor_read_timeout_ms must be >= 1");
        }
        if self.hardware.bit_delay_us > 50 {
            eyre::bail!("hardware.bit_delay_us must be <= 50 (HX711 powers down when SCK stays high)");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }

    /// Whether both encoder lines are wired.
    pub fn has_encoder(&self) -> bool {
        self.pins.encoder_a.is_some() && self.pins.encoder_b.is_some()
    }
}
