//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use actuator_core::error::{ActuatorError, BuildError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::DutyOutOfRange { duty, max } => format!(
                "What happened: Saturate duty {duty} is beyond the PWM range (max {max}).\nLikely causes: bands.saturate_duty does not match pwm.resolution_bits.\nHow to fix: Lower bands.saturate_duty or raise pwm.resolution_bits."
            ),
            other => format!(
                "What happened: Invalid configuration ({other}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/actuator.toml for a sample."
            ),
        };
    }

    if let Some(ae) = err.downcast_ref::<ActuatorError>() {
        return match ae {
            ActuatorError::Timeout => "What happened: Load cell read timed out.\nLikely causes: HX711 not wired correctly, no power/ground, or timeout too low.\nHow to fix: Verify DT/SCK pins and power, and consider increasing hardware.sensor_read_timeout_ms in the config.".to_string(),
            ActuatorError::HardwareFault(msg) | ActuatorError::Hardware(msg) => format!(
                "What happened: Hardware error ({msg}).\nLikely causes: GPIO/PWM not available or wired differently than configured.\nHow to fix: Check [pins] and that PWM is enabled in the boot config; rerun with --log-level=debug."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("open ") || lower.contains("gpio") {
        return format!(
            "What happened: Failed to initialize hardware ({msg}).\nLikely causes: Incorrect pin numbers, PWM overlay not enabled, or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process may access /dev/gpiomem and /sys/class/pwm."
        );
    }

    if lower.contains("invalid configuration") || lower.contains("parse config") {
        let detail = err
            .chain()
            .nth(1)
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        return format!(
            "What happened: Configuration is invalid or incomplete{detail}.\nLikely causes: Missing [pins] (hx711_dt, hx711_sck, motor_ina, motor_inb), or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file ({msg}).\nHow to fix: Pass --config <FILE> or create etc/actuator.toml."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 configuration, 3 sensor timeout, 4 hardware, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use actuator_core::error::{ActuatorError, BuildError};
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    match err.downcast_ref::<ActuatorError>() {
        Some(ActuatorError::Config(_)) => return 2,
        Some(ActuatorError::Timeout) => return 3,
        Some(ActuatorError::Hardware(_) | ActuatorError::HardwareFault(_)) => return 4,
        _ => {}
    }
    let lower = err.to_string().to_ascii_lowercase();
    if lower.contains("invalid configuration") || lower.contains("parse config") || lower.contains("read config") {
        return 2;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    use actuator_core::error::{ActuatorError, BuildError};
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    match err.downcast_ref::<ActuatorError>() {
        Some(ActuatorError::Timeout) => "Timeout",
        Some(ActuatorError::Hardware(_) | ActuatorError::HardwareFault(_)) => "Hardware",
        Some(ActuatorError::Config(_)) => "Config",
        Some(ActuatorError::State(_)) => "State",
        None if exit_code_for_error(err) == 2 => "Config",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actuator_core::error::{ActuatorError, BuildError};
    use eyre::WrapErr;
    use rstest::rstest;

    #[rstest]
    #[case(eyre::Report::new(ActuatorError::Timeout), 3, "timed out")]
    #[case(eyre::Report::new(ActuatorError::HardwareFault("busy".into())), 4, "Hardware error")]
    #[case(eyre::Report::new(BuildError::DutyOutOfRange { duty: 1024, max: 1023 }), 2, "PWM range")]
    #[case(eyre::eyre!("boom"), 1, "Something went wrong")]
    fn codes_and_messages(#[case] err: eyre::Report, #[case] code: i32, #[case] needle: &str) {
        assert_eq!(exit_code_for_error(&err), code);
        assert!(humanize(&err).contains(needle), "{}", humanize(&err));
    }

    #[test]
    fn wrapped_timeout_keeps_its_code() {
        let err = Err::<(), _>(ActuatorError::Timeout)
            .wrap_err("startup tare")
            .unwrap_err();
        assert_eq!(exit_code_for_error(&err), 3);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Timeout");
    }

    #[test]
    fn config_validation_message_is_passed_through() {
        let err = Err::<(), _>(eyre::eyre!("bands.dead must be >= 0"))
            .wrap_err("invalid configuration")
            .unwrap_err();
        assert_eq!(exit_code_for_error(&err), 2);
        assert!(humanize(&err).contains("bands.dead must be >= 0"));
    }
}
