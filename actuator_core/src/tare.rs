//! Tare calibration and the shared tare offset.
//!
//! The tare is the mean offset of the unloaded cell from the reference
//! reading. It is measured once at startup and again whenever the operator
//! presses the tare button.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use actuator_traits::{Clock, NotifyWaiter, SampleSource, Wait};
use eyre::WrapErr;

use crate::adjust::AdjustFactor;
use crate::error::{ActuatorError, Result};
use crate::hw_error::hw_report;
use crate::sensor::SharedSensor;
use crate::tasks::TASK_POLL;

/// Tare offset in raw counts, shared between the controller and tare task.
#[derive(Debug, Default)]
pub struct SharedTare(AtomicI32);

impl SharedTare {
    pub fn new(tare: i32) -> Self {
        Self(AtomicI32::new(tare))
    }

    pub fn get(&self) -> i32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, tare: i32) {
        self.0.store(tare, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TareCalibrator {
    pub samples: u32,
    /// Pause after each sample.
    pub settle: Duration,
    pub reference: u32,
    pub read_timeout: Duration,
}

impl Default for TareCalibrator {
    fn default() -> Self {
        Self {
            samples: 10,
            settle: Duration::from_millis(100),
            reference: 8_000_000,
            read_timeout: Duration::from_millis(1000),
        }
    }
}

impl TareCalibrator {
    /// Average `samples` reads of `raw - reference`, truncating toward zero.
    ///
    /// Any failed read aborts the run; the caller decides whether to keep an
    /// older tare.
    pub fn calibrate<S: SampleSource + ?Sized>(&self, sensor: &mut S, clock: &dyn Clock) -> Result<i32> {
        if self.samples == 0 {
            return Err(ActuatorError::Config("tare needs at least one sample".into()).into());
        }
        let mut sum: i64 = 0;
        for i in 0..self.samples {
            let raw = sensor
                .read_sample(self.read_timeout)
                .map_err(hw_report)
                .wrap_err_with(|| format!("tare sample {} of {}", i + 1, self.samples))?;
            sum += i64::from(raw) - i64::from(self.reference);
            clock.sleep(self.settle);
        }
        let mean = sum / i64::from(self.samples);
        let tare = mean.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        tracing::info!(tare, samples = self.samples, "tare calibrated");
        Ok(tare)
    }
}

/// Everything the tare task needs besides the button.
pub struct TareListener<S> {
    pub sensor: SharedSensor<S>,
    pub calibrator: TareCalibrator,
    pub tare: Arc<SharedTare>,
    pub adjust: Arc<AdjustFactor>,
    pub clock: Arc<dyn Clock + Send + Sync>,
}

impl<S: SampleSource> TareListener<S> {
    /// Handle one button press: reset the adjust factor and re-measure.
    /// A failed run leaves the previous tare in place.
    pub fn on_press(&self) {
        self.adjust.reset();
        tracing::info!("tare requested; adjust factor reset");
        let result = self
            .sensor
            .with(|s| self.calibrator.calibrate(s, self.clock.as_ref()));
        match result {
            Ok(t) => self.tare.set(t),
            Err(e) => {
                tracing::warn!(error = %e, kept = self.tare.get(), "tare failed; keeping previous value");
            }
        }
    }
}

/// Run [`TareListener::on_press`] for each button notification until shutdown.
pub fn spawn_tare_listener<S>(
    button: NotifyWaiter<()>,
    listener: TareListener<S>,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>>
where
    S: SampleSource + Send + 'static,
{
    std::thread::Builder::new()
        .name("tare-listener".into())
        .spawn(move || {
            while !shutdown.load(Ordering::Relaxed) {
                match button.poll(TASK_POLL) {
                    Wait::Signal(()) => listener.on_press(),
                    Wait::TimedOut => {}
                    Wait::Closed => break,
                }
            }
            tracing::trace!("tare listener exiting");
        })
}
