//! Raspberry Pi backend over `rppal`.
//!
//! GPIO edges are delivered by rppal's async-interrupt thread. Each callback
//! only posts into a single-slot notification through the shared
//! [`InterruptGate`], the way an ISR hands off to a task.
use std::sync::Arc;

use actuator_traits::{
    BoxError, EncoderPin, InterruptGate, LevelInput, NotifyWaiter, PwmChannel, notification,
};
use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use rppal::pwm::{Channel, Polarity, Pwm};

use crate::error::{HwError, Result};
use crate::hx711::{Hx711, SensorBus};

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

/// HX711 DT/SCK on two GPIO lines.
pub struct RppalBus {
    dt: InputPin,
    sck: OutputPin,
}

impl SensorBus for RppalBus {
    fn data_is_high(&mut self) -> bool {
        self.dt.is_high()
    }
    fn set_clock_high(&mut self) {
        self.sck.set_high();
    }
    fn set_clock_low(&mut self) {
        self.sck.set_low();
    }
}

/// Open the HX711 on `dt_pin`/`sck_pin`.
pub fn open_hx711(gpio: &Gpio, dt_pin: u8, sck_pin: u8, gate: Arc<InterruptGate>) -> Result<Hx711<RppalBus>> {
    let dt = gpio.get(dt_pin).map_err(gpio_err)?.into_input();
    let sck = gpio.get(sck_pin).map_err(gpio_err)?.into_output_low();
    tracing::info!(dt_pin, sck_pin, "hx711 opened");
    Ok(Hx711::new(RppalBus { dt, sck }, gate))
}

/// One hardware PWM channel driving an H-bridge input.
pub struct RppalPwm {
    pwm: Pwm,
    max_duty: u32,
    pending: u32,
}

impl RppalPwm {
    /// `channel` is 0 or 1 (PWM0 / PWM1).
    pub fn open(channel: u8, frequency_hz: f64, resolution_bits: u8) -> Result<Self> {
        let ch = match channel {
            0 => Channel::Pwm0,
            1 => Channel::Pwm1,
            other => return Err(HwError::Pin(format!("pwm channel {other} (use 0 or 1)"))),
        };
        let pwm = Pwm::with_frequency(ch, frequency_hz, 0.0, Polarity::Normal, true)
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        tracing::info!(channel, frequency_hz, resolution_bits, "pwm opened");
        Ok(Self {
            pwm,
            max_duty: (1u32 << resolution_bits.min(31)) - 1,
            pending: 0,
        })
    }
}

impl PwmChannel for RppalPwm {
    fn duty(&self) -> std::result::Result<u32, BoxError> {
        let fraction = self.pwm.duty_cycle()?;
        Ok((fraction * f64::from(self.max_duty)).round() as u32)
    }

    fn write_duty(&mut self, duty: u32) -> std::result::Result<(), BoxError> {
        self.pending = duty.min(self.max_duty);
        Ok(())
    }

    fn update(&mut self) -> std::result::Result<(), BoxError> {
        let fraction = f64::from(self.pending) / f64::from(self.max_duty.max(1));
        self.pwm.set_duty_cycle(fraction)?;
        Ok(())
    }

    fn max_duty(&self) -> u32 {
        self.max_duty
    }
}

/// Encoder line that the decode task samples after an edge notification.
pub struct GpioLevel(InputPin);

impl LevelInput for GpioLevel {
    fn is_high(&self) -> bool {
        self.0.is_high()
    }
}

/// Pin numbers for the interrupt-driven inputs. `None` disables a feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputPins {
    pub encoder: Option<(u8, u8)>,
    pub proximity: Option<u8>,
    pub button: Option<u8>,
}

/// Interrupt-driven inputs, already wired to their notifications.
pub struct InterruptInputs {
    pub encoder: Option<(GpioLevel, GpioLevel, NotifyWaiter<EncoderPin>)>,
    pub proximity: Option<NotifyWaiter<()>>,
    pub button: Option<NotifyWaiter<()>>,
    // Dropping an InputPin cancels its interrupt; keep the edge-only pins alive.
    _held: Vec<InputPin>,
}

/// Configure the encoder (falling edge, pull-down), proximity (rising edge,
/// pull-down) and button (falling edge, pull-up) inputs.
pub fn open_inputs(gpio: &Gpio, pins: InputPins, gate: Arc<InterruptGate>) -> Result<InterruptInputs> {
    let mut held = Vec::new();

    let encoder = match pins.encoder {
        Some((a_pin, b_pin)) => {
            let (tx, rx) = notification::<EncoderPin>();
            let mut a = gpio.get(a_pin).map_err(gpio_err)?.into_input_pulldown();
            let mut b = gpio.get(b_pin).map_err(gpio_err)?.into_input_pulldown();
            for (pin, id) in [(&mut a, EncoderPin::A), (&mut b, EncoderPin::B)] {
                let tx = tx.clone();
                let gate = gate.clone();
                pin.set_async_interrupt(Trigger::FallingEdge, move |_| {
                    gate.dispatch(|| tx.notify(id));
                })
                .map_err(gpio_err)?;
            }
            tracing::info!(a_pin, b_pin, "encoder interrupts armed");
            Some((GpioLevel(a), GpioLevel(b), rx))
        }
        None => None,
    };

    let mut edge_input = |pin_no: u8, trigger: Trigger, pull_up: bool| -> Result<NotifyWaiter<()>> {
        let (tx, rx) = notification::<()>();
        let pin = gpio.get(pin_no).map_err(gpio_err)?;
        let mut pin = if pull_up {
            pin.into_input_pullup()
        } else {
            pin.into_input_pulldown()
        };
        let gate = gate.clone();
        pin.set_async_interrupt(trigger, move |_| gate.dispatch(|| tx.notify(())))
            .map_err(gpio_err)?;
        held.push(pin);
        Ok(rx)
    };

    let proximity = pins
        .proximity
        .map(|p| edge_input(p, Trigger::RisingEdge, false))
        .transpose()?;
    let button = pins
        .button
        .map(|p| edge_input(p, Trigger::FallingEdge, true))
        .transpose()?;
    tracing::info!(
        proximity = ?pins.proximity,
        button = ?pins.button,
        "edge interrupts armed"
    );

    Ok(InterruptInputs {
        encoder,
        proximity,
        button,
        _held: held,
    })
}

/// Open the GPIO controller.
pub fn gpio() -> Result<Gpio> {
    Gpio::new().map_err(gpio_err)
}
