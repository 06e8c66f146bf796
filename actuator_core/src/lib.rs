#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Force-following actuator control (hardware-agnostic).
//!
//! All hardware goes through the `actuator_traits` seams: `SampleSource` for
//! the load cell, `HBridge` for the motor, `EndStop` for the proximity
//! sensor and `LevelInput` for the encoder lines.
//!
//! ## Architecture
//!
//! - **Motion**: the Idle → Creep → Saturate → Coast → Reverse → Coast cycle (`motion`)
//! - **Tare**: startup and button-triggered zero calibration (`tare`)
//! - **Adjust**: encoder decoding and the timing multiplier (`quadrature`, `adjust`)
//! - **Drive**: duty writes and the two-channel H-bridge (`duty`)
//! - **Runner**: task wiring and the main loop (`runner`)
//!
//! Raw counts stay integral end to end; the adjust factor is kept in tenths.

pub mod adjust;
pub mod config;
pub mod conversions;
pub mod duty;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod motion;
pub mod quadrature;
pub mod runner;
pub mod sensor;
pub mod tare;
pub mod tasks;
pub mod util;

pub use adjust::AdjustFactor;
pub use config::{Bands, SensorCfg, Timing};
pub use duty::{PwmBridge, set_duty};
pub use error::{ActuatorError, BuildError, Result};
pub use motion::{MotionController, MotionPhase, Reading, TimeoutOnly};
pub use quadrature::{QuadratureDecoder, RotationEvent};
pub use runner::{EncoderWiring, RunParams, RunSummary, Wiring, run};
pub use sensor::SharedSensor;
pub use tare::{SharedTare, TareCalibrator};
