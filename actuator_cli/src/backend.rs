//! Hardware assembly: rppal peripherals with `--features hardware` on Linux,
//! the simulated load cell and PWM otherwise.

use actuator_config::Config;
use actuator_core::{PwmBridge, Wiring};
use actuator_traits::{HBridge, SampleSource};

pub type Sensor = Box<dyn SampleSource + Send>;
pub type Bridge = Box<dyn HBridge + Send>;

/// Resting raw reading of the simulated cell, relative to `tare.reference`.
pub const SIM_REST_OFFSET: u32 = 120;

/// Opened peripherals. `guard` holds resources that must outlive the run
/// (interrupt registrations on the board).
pub struct Backend {
    pub name: &'static str,
    pub wiring: Wiring<Sensor, Bridge>,
    guard: Option<Box<dyn std::any::Any>>,
}

pub struct BackendGuard(#[allow(dead_code)] Option<Box<dyn std::any::Any>>);

impl Backend {
    pub fn into_parts(self) -> (Wiring<Sensor, Bridge>, BackendGuard) {
        (self.wiring, BackendGuard(self.guard))
    }
}

pub fn open(cfg: &Config) -> eyre::Result<Backend> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        open_rppal(cfg)
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        Ok(open_simulated(cfg))
    }
}

#[cfg_attr(all(feature = "hardware", target_os = "linux"), allow(dead_code))]
fn open_simulated(cfg: &Config) -> Backend {
    use actuator_hardware::{SimulatedLoadCell, SimulatedPwm};

    let rest = cfg.tare.reference.saturating_add(SIM_REST_OFFSET);
    let bits = cfg.pwm.resolution_bits;
    tracing::info!(rest, resolution_bits = bits, "using simulated backend");
    Backend {
        name: "simulated",
        wiring: Wiring {
            sensor: Box::new(SimulatedLoadCell::new(rest)),
            bridge: Box::new(PwmBridge::new(
                SimulatedPwm::new("ina", bits),
                SimulatedPwm::new("inb", bits),
            )),
            encoder: None,
            proximity: None,
            button: None,
        },
        guard: None,
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_rppal(cfg: &Config) -> eyre::Result<Backend> {
    use actuator_core::EncoderWiring;
    use actuator_hardware::rpi;
    use actuator_traits::InterruptGate;
    use eyre::WrapErr;
    use std::sync::Arc;
    use std::time::Duration;

    let p = &cfg.pins;
    let gate = Arc::new(InterruptGate::new());
    let gpio = rpi::gpio().wrap_err("open gpio")?;
    let hx = rpi::open_hx711(&gpio, p.hx711_dt, p.hx711_sck, gate.clone())
        .wrap_err("open hx711")?
        .with_bit_delay(Duration::from_micros(cfg.hardware.bit_delay_us));
    let ina = rpi::RppalPwm::open(p.motor_ina, cfg.pwm.frequency_hz, cfg.pwm.resolution_bits)
        .wrap_err("open motor pwm (ina)")?;
    let inb = rpi::RppalPwm::open(p.motor_inb, cfg.pwm.frequency_hz, cfg.pwm.resolution_bits)
        .wrap_err("open motor pwm (inb)")?;

    let pins = rpi::InputPins {
        encoder: p.encoder_a.zip(p.encoder_b),
        proximity: p.proximity,
        button: p.button,
    };
    let mut inputs = rpi::open_inputs(&gpio, pins, gate).wrap_err("open input pins")?;
    let encoder = inputs.encoder.take().map(|(a, b, edges)| EncoderWiring {
        a: Box::new(a),
        b: Box::new(b),
        edges,
    });
    let proximity = inputs.proximity.take();
    let button = inputs.button.take();

    Ok(Backend {
        name: "rppal",
        wiring: Wiring {
            sensor: Box::new(hx),
            bridge: Box::new(PwmBridge::new(ina, inb)),
            encoder,
            proximity,
            button,
        },
        guard: Some(Box::new(inputs)),
    })
}
