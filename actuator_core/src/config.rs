//! Runtime configuration types for the motion controller.
//!
//! These are separate from the TOML-deserialized config in `actuator_config`;
//! see `conversions` for the mapping.
use std::time::Duration;

use crate::error::BuildError;

/// Force bands in raw counts net of tare.
///
/// Fields are private so a `Bands` value always satisfies
/// `0 <= dead < saturate_threshold` and `0 < creep_duty <= saturate_duty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bands {
    dead: i32,
    creep_threshold: i32,
    creep_duty: u32,
    saturate_threshold: i32,
    saturate_duty: u32,
}

impl Bands {
    pub fn new(
        dead: i32,
        creep_threshold: i32,
        creep_duty: u32,
        saturate_threshold: i32,
        saturate_duty: u32,
    ) -> Result<Self, BuildError> {
        if dead < 0 {
            return Err(BuildError::InvalidBands("dead must be >= 0"));
        }
        if dead >= saturate_threshold {
            return Err(BuildError::InvalidBands("dead must be < saturate_threshold"));
        }
        if creep_threshold > saturate_threshold {
            return Err(BuildError::InvalidBands(
                "creep_threshold must be <= saturate_threshold",
            ));
        }
        if creep_duty == 0 {
            return Err(BuildError::InvalidBands("creep_duty must be > 0"));
        }
        if creep_duty > saturate_duty {
            return Err(BuildError::InvalidBands("creep_duty must be <= saturate_duty"));
        }
        Ok(Self {
            dead,
            creep_threshold,
            creep_duty,
            saturate_threshold,
            saturate_duty,
        })
    }

    /// Reject duties the PWM peripheral cannot represent.
    pub fn check_duty(&self, max_duty: u32) -> Result<(), BuildError> {
        if self.saturate_duty > max_duty {
            return Err(BuildError::DutyOutOfRange {
                duty: self.saturate_duty,
                max: max_duty,
            });
        }
        Ok(())
    }

    pub fn dead(&self) -> i32 {
        self.dead
    }
    /// Informational; the creep decision uses `live > 0`.
    pub fn creep_threshold(&self) -> i32 {
        self.creep_threshold
    }
    pub fn creep_duty(&self) -> u32 {
        self.creep_duty
    }
    pub fn saturate_threshold(&self) -> i32 {
        self.saturate_threshold
    }
    pub fn saturate_duty(&self) -> u32 {
        self.saturate_duty
    }
}

impl Default for Bands {
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

/// Phase timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    /// One actuator screw rotation at full duty.
    pub period: Duration,
    /// Saturate timeout at unity adjust, in periods.
    pub forward_saturate_periods: u32,
    /// Nominal reverse time at unity adjust, in periods.
    pub reverse_periods: u32,
    pub creep_settle: Duration,
    pub creep_poll: Duration,
    pub idle_poll: Duration,
    pub coast_forward: Duration,
    pub coast_reverse: Duration,
}

impl Timing {
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.period.is_zero() {
            return Err(BuildError::InvalidTiming("period must be > 0"));
        }
        if self.forward_saturate_periods == 0 || self.reverse_periods == 0 {
            return Err(BuildError::InvalidTiming("period counts must be >= 1"));
        }
        if self.creep_poll.is_zero() || self.idle_poll.is_zero() {
            return Err(BuildError::InvalidTiming("poll intervals must be > 0"));
        }
        Ok(())
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(39),
            forward_saturate_periods: 8,
            reverse_periods: 10,
            creep_settle: Duration::from_millis(500),
            creep_poll: Duration::from_millis(28),
            idle_poll: Duration::from_millis(75),
            coast_forward: Duration::from_millis(100),
            coast_reverse: Duration::from_millis(400),
        }
    }
}

/// How the controller talks to the load cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorCfg {
    /// Raw reading treated as zero before tare.
    pub reference: u32,
    pub read_timeout: Duration,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            reference: 8_000_000,
            read_timeout: Duration::from_millis(1000),
        }
    }
}
