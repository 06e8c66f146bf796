//! Subcommand bodies: config mapping, hardware assembly, and output.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use actuator_config::Config;
use actuator_core::hw_error::{hw_report, map_hw_error};
use actuator_core::{Bands, Reading, RunParams, SensorCfg, TareCalibrator, Timing};
use actuator_traits::{Clock, HBridge, MonotonicClock, SampleSource};
use eyre::WrapErr;
use serde_json::json;

use crate::backend;
use crate::cli::RtLock;
use crate::rt::setup_rt_once;

fn clock() -> Arc<dyn Clock + Send + Sync> {
    Arc::new(MonotonicClock::new())
}

fn emit(json_mode: bool, value: serde_json::Value, text: String) {
    if json_mode {
        println!("{value}");
    } else {
        println!("{text}");
    }
}

pub struct RtOptions {
    pub enabled: bool,
    pub prio: Option<i32>,
    pub lock: Option<RtLock>,
    pub cpu: Option<usize>,
}

pub fn run(
    cfg: &Config,
    max_cycles: Option<u64>,
    rt: RtOptions,
    json_mode: bool,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    setup_rt_once(rt.enabled, rt.prio, rt.lock.unwrap_or(RtLock::os_default()), rt.cpu);

    let params = RunParams {
        bands: Bands::try_from(&cfg.bands).wrap_err("invalid configuration")?,
        timing: Timing::from(&cfg.timing),
        sensor: SensorCfg::from(cfg),
        tare: TareCalibrator::from(cfg),
        max_cycles,
    };
    tracing::info!(
        dead = params.bands.dead(),
        creep_threshold = params.bands.creep_threshold(),
        saturate_threshold = params.bands.saturate_threshold(),
        ?max_cycles,
        "starting run"
    );

    let backend = backend::open(cfg)?;
    let name = backend.name;
    let (wiring, _guard) = backend.into_parts();
    let summary = actuator_core::run(wiring, params, clock(), shutdown)?;

    emit(
        json_mode,
        json!({
            "cycles": summary.cycles,
            "tare": summary.tare,
            "adjust": summary.adjust,
            "backend": name,
        }),
        format!(
            "run complete: {} cycles, tare {}, adjust {:.1}",
            summary.cycles, summary.tare, summary.adjust
        ),
    );
    Ok(())
}

/// Open the backend and make sure the motor is off before touching the cell.
fn sensor_only(cfg: &Config) -> eyre::Result<(backend::Sensor, backend::BackendGuard)> {
    let (mut wiring, guard) = backend::open(cfg)?.into_parts();
    wiring
        .bridge
        .coast()
        .map_err(hw_report)
        .wrap_err("coast motor")?;
    Ok((wiring.sensor, guard))
}

pub fn tare(cfg: &Config, json_mode: bool) -> eyre::Result<()> {
    let (mut sensor, _guard) = sensor_only(cfg)?;
    let calibrator = TareCalibrator::from(cfg);
    let tare = calibrator.calibrate(&mut sensor, clock().as_ref())?;
    emit(
        json_mode,
        json!({ "tare": tare, "samples": calibrator.samples, "reference": calibrator.reference }),
        format!("tare: {tare}"),
    );
    Ok(())
}

/// Stream `diff,live,raw,tare` rows at the idle poll rate.
pub fn monitor(cfg: &Config, count: Option<u64>, shutdown: Arc<AtomicBool>) -> eyre::Result<()> {
    let (mut sensor, _guard) = sensor_only(cfg)?;
    let clock = clock();
    let tare = TareCalibrator::from(cfg).calibrate(&mut sensor, clock.as_ref())?;
    let sensor_cfg = SensorCfg::from(cfg);
    let dead = cfg.bands.dead;
    let period = Duration::from_millis(cfg.timing.idle_poll_ms);

    let stdout = std::io::stdout();
    let mut out = csv::Writer::from_writer(stdout.lock());
    out.write_record(["diff", "live", "raw", "tare"])?;
    out.flush()?;

    let mut rows = 0u64;
    while !shutdown.load(Ordering::Relaxed) && count.is_none_or(|n| rows < n) {
        match sensor.read_sample(sensor_cfg.read_timeout) {
            Ok(raw) => {
                let r = Reading::new(raw, sensor_cfg.reference, tare, dead);
                out.write_record([
                    r.diff.to_string(),
                    r.live.to_string(),
                    r.raw.to_string(),
                    r.tare.to_string(),
                ])?;
                out.flush()?;
                rows += 1;
            }
            Err(e) => {
                tracing::warn!(error = %map_hw_error(&*e), "sample failed");
            }
        }
        clock.sleep(period);
    }
    Ok(())
}

pub fn self_check(cfg: &Config, json_mode: bool) -> eyre::Result<()> {
    let backend = backend::open(cfg)?;
    let name = backend.name;
    let (mut wiring, _guard) = backend.into_parts();
    wiring
        .bridge
        .coast()
        .map_err(hw_report)
        .wrap_err("coast motor")?;
    let max_duty = wiring.bridge.max_duty();
    Bands::try_from(&cfg.bands)?
        .check_duty(max_duty)
        .wrap_err("invalid configuration")?;
    let timeout = Duration::from_millis(cfg.hardware.sensor_read_timeout_ms);
    let raw = wiring
        .sensor
        .read_sample(timeout)
        .map_err(hw_report)
        .wrap_err("read hx711")?;

    let encoder = wiring.encoder.is_some();
    let proximity = wiring.proximity.is_some();
    let button = wiring.button.is_some();
    emit(
        json_mode,
        json!({
            "ok": true,
            "backend": name,
            "raw": raw,
            "max_duty": max_duty,
            "encoder": encoder,
            "proximity": proximity,
            "button": button,
        }),
        format!(
            "self-check ok ({name}): raw {raw}, max duty {max_duty}, encoder {}, proximity {}, button {}",
            on_off(encoder),
            on_off(proximity),
            on_off(button)
        ),
    );
    let _ = std::io::stdout().flush();
    Ok(())
}

fn on_off(b: bool) -> &'static str {
    if b { "on" } else { "off" }
}
