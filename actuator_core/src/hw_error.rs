//! Maps `Box<dyn Error>` from trait boundaries to typed `ActuatorError`.
//!
//! The traits in `actuator_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `actuator_hardware::HwError` downcasting.

use crate::error::{ActuatorError, Report};
use actuator_traits::BoxError;

/// Map a trait-boundary error to a typed `ActuatorError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ActuatorError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<actuator_hardware::error::HwError>() {
            return match hw {
                actuator_hardware::error::HwError::DataReadyTimeout => ActuatorError::Timeout,
                other => ActuatorError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        ActuatorError::Timeout
    } else {
        ActuatorError::Hardware(s)
    }
}

/// Convenience for `map_err` at call sites that return `eyre::Result`.
pub fn hw_report(e: BoxError) -> Report {
    Report::new(map_hw_error(&*e))
}
