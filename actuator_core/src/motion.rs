//! Force-following motion state machine.
//!
//! ```text
//!   Idle ──live>0──▶ CreepForward ──live>saturate──▶ SaturateForward
//!    ▲                   │ live<0                        │ end stop / timeout
//!    │◀──────────────────┘                               ▼
//!    │                                              CoastForward
//!    │                                                   │
//!   CoastReverse ◀────────── ReverseDrive ◀──────────────┘
//! ```
//!
//! Each [`MotionController::step`] performs one phase's work (a sample and
//! poll delay, or a timed drive) and applies at most one transition. Entry
//! actions set the bridge; all delays go through the injected [`Clock`].
use std::sync::Arc;
use std::time::{Duration, Instant};

use actuator_traits::{Clock, EndStop, HBridge, MonotonicClock, SampleSource};
use tracing::{debug, error, info};

use crate::adjust::AdjustFactor;
use crate::config::{Bands, SensorCfg, Timing};
use crate::error::{BuildError, Result};
use crate::hw_error::{hw_report, map_hw_error};
use crate::tare::SharedTare;
use crate::util::{as_ms, scale_tenths};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionPhase {
    #[default]
    Idle,
    CreepForward,
    SaturateForward,
    CoastForward,
    ReverseDrive,
    CoastReverse,
}

/// One load-cell sample resolved against reference, tare and dead band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub raw: u32,
    pub tare: i32,
    /// `raw - reference - tare`
    pub diff: i32,
    /// `diff - dead`; positive means the operator is pushing past the dead band.
    pub live: i32,
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl Reading {
    pub fn new(raw: u32, reference: u32, tare: i32, dead: i32) -> Self {
        let diff = i64::from(raw) - i64::from(reference) - i64::from(tare);
        let live = diff - i64::from(dead);
        Self {
            raw,
            tare,
            diff: clamp_i32(diff),
            live: clamp_i32(live),
        }
    }
}

/// Longest the saturate phase may drive forward at adjust `tenths / 10`.
pub fn forward_timeout(timing: &Timing, adjust_tenths: u32) -> Duration {
    scale_tenths(
        timing.period.saturating_mul(timing.forward_saturate_periods),
        adjust_tenths,
    )
}

/// Reverse drive time: the nominal reverse time, or proportionally less when
/// the forward stroke ended early so the actuator does not over-retract.
pub fn reverse_duration(timing: &Timing, adjust_tenths: u32, forward_elapsed: Duration) -> Duration {
    let nominal = scale_tenths(timing.period.saturating_mul(timing.reverse_periods), adjust_tenths);
    let proportional =
        forward_elapsed.saturating_mul(timing.reverse_periods) / timing.forward_saturate_periods.max(1);
    nominal.min(proportional)
}

/// End stop for rigs without a proximity sensor: always runs to the timeout.
pub struct TimeoutOnly {
    clock: Arc<dyn Clock + Send + Sync>,
}

impl TimeoutOnly {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { clock }
    }
}

impl EndStop for TimeoutOnly {
    fn clear(&mut self) {}

    fn wait(&mut self, timeout: Duration) -> bool {
        self.clock.sleep(timeout);
        false
    }
}

pub struct MotionControllerBuilder<S, B> {
    sensor: S,
    bridge: B,
    bands: Bands,
    timing: Timing,
    sensor_cfg: SensorCfg,
    end_stop: Option<Box<dyn EndStop + Send>>,
    tare: Option<Arc<SharedTare>>,
    adjust: Option<Arc<AdjustFactor>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

impl<S: SampleSource, B: HBridge> MotionControllerBuilder<S, B> {
    pub fn with_bands(mut self, bands: Bands) -> Self {
        self.bands = bands;
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_sensor_cfg(mut self, cfg: SensorCfg) -> Self {
        self.sensor_cfg = cfg;
        self
    }

    /// Defaults to [`TimeoutOnly`].
    pub fn with_end_stop(mut self, end_stop: impl EndStop + Send + 'static) -> Self {
        self.end_stop = Some(Box::new(end_stop));
        self
    }

    pub fn with_tare(mut self, tare: Arc<SharedTare>) -> Self {
        self.tare = Some(tare);
        self
    }

    pub fn with_adjust(mut self, adjust: Arc<AdjustFactor>) -> Self {
        self.adjust = Some(adjust);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> std::result::Result<MotionController<S, B>, BuildError> {
        self.timing.validate()?;
        self.bands.check_duty(self.bridge.max_duty())?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let end_stop = self
            .end_stop
            .unwrap_or_else(|| Box::new(TimeoutOnly::new(clock.clone())));
        Ok(MotionController {
            sensor: self.sensor,
            bridge: self.bridge,
            end_stop,
            bands: self.bands,
            timing: self.timing,
            sensor_cfg: self.sensor_cfg,
            tare: self.tare.unwrap_or_default(),
            adjust: self.adjust.unwrap_or_default(),
            clock,
            phase: MotionPhase::Idle,
            saturate_started: None,
            forward_elapsed: Duration::ZERO,
            last_reading: None,
            cycles: 0,
        })
    }
}

pub struct MotionController<S, B> {
    sensor: S,
    bridge: B,
    end_stop: Box<dyn EndStop + Send>,
    bands: Bands,
    timing: Timing,
    sensor_cfg: SensorCfg,
    tare: Arc<SharedTare>,
    adjust: Arc<AdjustFactor>,
    clock: Arc<dyn Clock + Send + Sync>,
    phase: MotionPhase,
    saturate_started: Option<Instant>,
    forward_elapsed: Duration,
    last_reading: Option<Reading>,
    cycles: u64,
}

impl<S: SampleSource, B: HBridge> MotionController<S, B> {
    pub fn builder(sensor: S, bridge: B) -> MotionControllerBuilder<S, B> {
        MotionControllerBuilder {
            sensor,
            bridge,
            bands: Bands::default(),
            timing: Timing::default(),
            sensor_cfg: SensorCfg::default(),
            end_stop: None,
            tare: None,
            adjust: None,
            clock: None,
        }
    }

    pub fn phase(&self) -> MotionPhase {
        self.phase
    }

    /// Completed forward/reverse cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn last_reading(&self) -> Option<Reading> {
        self.last_reading
    }

    /// How long the most recent saturate stroke drove forward.
    pub fn forward_elapsed(&self) -> Duration {
        self.forward_elapsed
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    /// Run the current phase once and apply its transition, if any.
    pub fn step(&mut self) -> Result<MotionPhase> {
        let next = match self.phase {
            MotionPhase::Idle => match self.sample() {
                Some(r) if r.live > 0 => MotionPhase::CreepForward,
                _ => {
                    self.clock.sleep(self.timing.idle_poll);
                    MotionPhase::Idle
                }
            },
            MotionPhase::CreepForward => match self.sample() {
                None => MotionPhase::Idle,
                Some(r) if r.live < 0 => MotionPhase::Idle,
                Some(r) if r.live > self.bands.saturate_threshold() => MotionPhase::SaturateForward,
                Some(_) => {
                    self.clock.sleep(self.timing.creep_poll);
                    MotionPhase::CreepForward
                }
            },
            MotionPhase::SaturateForward => {
                let started = self.saturate_started.take().unwrap_or_else(|| self.clock.now());
                let timeout = forward_timeout(&self.timing, self.adjust.tenths());
                let remaining = timeout.saturating_sub(self.clock.elapsed_since(started));
                let end_stop = self.end_stop.wait(remaining);
                self.forward_elapsed = self.clock.elapsed_since(started);
                info!(
                    end_stop,
                    elapsed_ms = as_ms(self.forward_elapsed),
                    timeout_ms = as_ms(timeout),
                    "forward stroke finished"
                );
                MotionPhase::CoastForward
            }
            MotionPhase::CoastForward => {
                self.clock.sleep(self.timing.coast_forward);
                MotionPhase::ReverseDrive
            }
            MotionPhase::ReverseDrive => {
                let d = reverse_duration(&self.timing, self.adjust.tenths(), self.forward_elapsed);
                debug!(reverse_ms = as_ms(d), "reversing");
                self.clock.sleep(d);
                MotionPhase::CoastReverse
            }
            MotionPhase::CoastReverse => {
                self.clock.sleep(self.timing.coast_reverse);
                self.cycles += 1;
                MotionPhase::Idle
            }
        };
        if next != self.phase {
            self.enter(next)?;
        }
        Ok(self.phase)
    }

    /// Coast the motor and return to `Idle`.
    pub fn halt(&mut self) -> Result<()> {
        self.phase = MotionPhase::Idle;
        self.saturate_started = None;
        self.bridge.coast().map_err(hw_report)
    }

    fn enter(&mut self, next: MotionPhase) -> Result<()> {
        info!(from = ?self.phase, to = ?next, adjust = self.adjust.get(), "phase");
        self.phase = next;
        match next {
            MotionPhase::Idle | MotionPhase::CoastForward | MotionPhase::CoastReverse => {
                self.bridge.coast().map_err(hw_report)?;
            }
            MotionPhase::CreepForward => {
                self.bridge
                    .drive_forward(self.bands.creep_duty())
                    .map_err(hw_report)?;
                self.clock.sleep(self.timing.creep_settle);
            }
            MotionPhase::SaturateForward => {
                // a trigger left over from the previous stroke is not ours
                self.end_stop.clear();
                self.bridge
                    .drive_forward(self.bands.saturate_duty())
                    .map_err(hw_report)?;
                self.saturate_started = Some(self.clock.now());
            }
            MotionPhase::ReverseDrive => {
                self.bridge
                    .drive_reverse(self.bands.saturate_duty())
                    .map_err(hw_report)?;
            }
        }
        Ok(())
    }

    /// Read the cell. On failure the motor is coasted and `None` returned.
    fn sample(&mut self) -> Option<Reading> {
        match self.sensor.read_sample(self.sensor_cfg.read_timeout) {
            Ok(raw) => {
                let r = Reading::new(raw, self.sensor_cfg.reference, self.tare.get(), self.bands.dead());
                debug!(diff = r.diff, live = r.live, raw = r.raw, tare = r.tare, "sample");
                self.last_reading = Some(r);
                Some(r)
            }
            Err(e) => {
                error!(error = %map_hw_error(&*e), phase = ?self.phase, "sensor read failed; coasting");
                if let Err(e) = self.bridge.coast() {
                    error!(error = %map_hw_error(&*e), "coast after sensor failure failed");
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(8_000_000, 0, 10_000, 0, -10_000)]
    #[case(8_010_055, 55, 10_000, 10_000, 0)]
    #[case(0, 0, 0, -8_000_000, -8_000_000)]
    fn reading_subtracts_reference_tare_and_dead(
        #[case] raw: u32,
        #[case] tare: i32,
        #[case] dead: i32,
        #[case] diff: i32,
        #[case] live: i32,
    ) {
        let r = Reading::new(raw, 8_000_000, tare, dead);
        assert_eq!((r.diff, r.live), (diff, live));
    }

    #[test]
    fn default_timeout_is_eight_periods() {
        let t = Timing::default();
        assert_eq!(forward_timeout(&t, 10), Duration::from_millis(312));
        assert_eq!(forward_timeout(&t, 20), Duration::from_millis(624));
    }

    #[rstest]
    #[case(Duration::from_millis(5), 10, Duration::from_micros(6_250))]
    #[case(Duration::from_millis(312), 10, Duration::from_millis(390))]
    #[case(Duration::from_millis(312), 5, Duration::from_millis(195))]
    #[case(Duration::from_millis(400), 10, Duration::from_millis(390))]
    fn reverse_takes_the_shorter_of_nominal_and_proportional(
        #[case] elapsed: Duration,
        #[case] tenths: u32,
        #[case] expected: Duration,
    ) {
        assert_eq!(reverse_duration(&Timing::default(), tenths, elapsed), expected);
    }
}
