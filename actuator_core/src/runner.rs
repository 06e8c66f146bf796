//! Wiring and main loop for a full controller run.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use actuator_traits::{Clock, EncoderPin, EndStop, HBridge, LevelInput, NotifyWaiter, SampleSource};
use eyre::WrapErr;

use crate::adjust::{AdjustFactor, spawn_regulator};
use crate::config::{Bands, SensorCfg, Timing};
use crate::error::Result;
use crate::hw_error::hw_report;
use crate::motion::{MotionController, TimeoutOnly};
use crate::quadrature::{rotation_channel, spawn_decoder};
use crate::sensor::SharedSensor;
use crate::tare::{SharedTare, TareCalibrator, TareListener, spawn_tare_listener};
use crate::tasks::Tasks;

/// Encoder lines plus the edge notification they share.
pub struct EncoderWiring {
    pub a: Box<dyn LevelInput + Send>,
    pub b: Box<dyn LevelInput + Send>,
    pub edges: NotifyWaiter<EncoderPin>,
}

/// Peripherals for one run. Optional inputs that are `None` disable the
/// adjust wheel, the end stop (timeout only) or the tare button.
pub struct Wiring<S, B> {
    pub sensor: S,
    pub bridge: B,
    pub encoder: Option<EncoderWiring>,
    pub proximity: Option<NotifyWaiter<()>>,
    pub button: Option<NotifyWaiter<()>>,
}

#[derive(Debug, Clone, Default)]
pub struct RunParams {
    pub bands: Bands,
    pub timing: Timing,
    pub sensor: SensorCfg,
    pub tare: TareCalibrator,
    /// Stop after this many completed cycles.
    pub max_cycles: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub cycles: u64,
    /// Tare in effect when the run ended.
    pub tare: i32,
    pub adjust: f32,
}

/// Tare, start the input tasks, then step the controller until `shutdown`
/// is raised or `max_cycles` is reached. The motor is coasted on every exit path.
pub fn run<S, B>(
    wiring: Wiring<S, B>,
    params: RunParams,
    clock: Arc<dyn Clock + Send + Sync>,
    shutdown: Arc<AtomicBool>,
) -> Result<RunSummary>
where
    S: SampleSource + Send + 'static,
    B: HBridge,
{
    let Wiring {
        sensor,
        mut bridge,
        encoder,
        proximity,
        button,
    } = wiring;

    bridge.coast().map_err(hw_report).wrap_err("initial coast")?;

    let sensor = SharedSensor::new(sensor);
    let startup_tare = sensor
        .with(|s| params.tare.calibrate(s, clock.as_ref()))
        .wrap_err("startup tare")?;
    let tare = Arc::new(SharedTare::new(startup_tare));
    let adjust = Arc::new(AdjustFactor::new());

    let mut tasks = Tasks::new();
    if let Some(enc) = encoder {
        let (tx, rx) = rotation_channel();
        let h = spawn_decoder(enc.a, enc.b, enc.edges, tx, tasks.shutdown_flag())
            .wrap_err("spawn encoder decoder")?;
        tasks.push("encoder-decode", h);
        let h = spawn_regulator(rx, adjust.clone(), tasks.shutdown_flag())
            .wrap_err("spawn adjust regulator")?;
        tasks.push("adjust-regulator", h);
    }
    if let Some(button) = button {
        let listener = TareListener {
            sensor: sensor.clone(),
            calibrator: params.tare.clone(),
            tare: tare.clone(),
            adjust: adjust.clone(),
            clock: clock.clone(),
        };
        let h = spawn_tare_listener(button, listener, tasks.shutdown_flag())
            .wrap_err("spawn tare listener")?;
        tasks.push("tare-listener", h);
    }
    tracing::info!(tasks = ?tasks.names(), tare = startup_tare, "controller starting");

    let end_stop: Box<dyn EndStop + Send> = match proximity {
        Some(p) => Box::new(p),
        None => Box::new(TimeoutOnly::new(clock.clone())),
    };
    let mut ctl = MotionController::builder(sensor, bridge)
        .with_bands(params.bands)
        .with_timing(params.timing)
        .with_sensor_cfg(params.sensor)
        .with_end_stop(end_stop)
        .with_tare(tare.clone())
        .with_adjust(adjust.clone())
        .with_clock(clock)
        .build()?;

    let outcome = loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break Ok(());
        }
        if let Err(e) = ctl.step() {
            break Err(e);
        }
        if params.max_cycles.is_some_and(|max| ctl.cycles() >= max) {
            break Ok(());
        }
    };

    let halted = ctl.halt();
    drop(tasks);
    outcome?;
    halted.wrap_err("final coast")?;

    let summary = RunSummary {
        cycles: ctl.cycles(),
        tare: tare.get(),
        adjust: adjust.get(),
    };
    tracing::info!(cycles = summary.cycles, tare = summary.tare, "controller stopped");
    Ok(summary)
}
