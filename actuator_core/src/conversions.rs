//! Conversions from `actuator_config` types to `actuator_core` types.

use std::time::Duration;

use crate::config::{Bands, SensorCfg, Timing};
use crate::error::BuildError;
use crate::tare::TareCalibrator;

// ── Bands ────────────────────────────────────────────────────────────────────

impl TryFrom<&actuator_config::BandsCfg> for Bands {
    type Error = BuildError;

    fn try_from(c: &actuator_config::BandsCfg) -> Result<Self, Self::Error> {
        Bands::new(
            c.dead,
            c.creep_threshold,
            c.creep_duty,
            c.saturate_threshold,
            c.saturate_duty,
        )
    }
}

// ── Timing ───────────────────────────────────────────────────────────────────

impl From<&actuator_config::TimingCfg> for Timing {
    fn from(c: &actuator_config::TimingCfg) -> Self {
        Self {
            period: Duration::from_millis(c.period_ms),
            forward_saturate_periods: c.forward_saturate_periods,
            reverse_periods: c.reverse_periods,
            creep_settle: Duration::from_millis(c.creep_settle_ms),
            creep_poll: Duration::from_millis(c.creep_poll_ms),
            idle_poll: Duration::from_millis(c.idle_poll_ms),
            coast_forward: Duration::from_millis(c.coast_forward_ms),
            coast_reverse: Duration::from_millis(c.coast_reverse_ms),
        }
    }
}

// ── Sensor ───────────────────────────────────────────────────────────────────

impl From<&actuator_config::Config> for SensorCfg {
    fn from(c: &actuator_config::Config) -> Self {
        Self {
            reference: c.tare.reference,
            read_timeout: Duration::from_millis(c.hardware.sensor_read_timeout_ms),
        }
    }
}

// ── Tare ─────────────────────────────────────────────────────────────────────

impl From<&actuator_config::Config> for TareCalibrator {
    fn from(c: &actuator_config::Config) -> Self {
        Self {
            samples: c.tare.samples,
            settle: Duration::from_millis(c.tare.settle_ms),
            reference: c.tare.reference,
            read_timeout: Duration::from_millis(c.hardware.sensor_read_timeout_ms),
        }
    }
}
