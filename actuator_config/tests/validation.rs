use actuator_config::load_toml;
use rstest::rstest;

const PINS: &str = r#"
[pins]
hx711_dt = 6
hx711_sck = 10
motor_ina = 0
motor_inb = 1
encoder_a = 7
encoder_b = 2
button = 5
proximity = 4
"#;

fn with_pins(extra: &str) -> String {
    format!("{PINS}\n{extra}")
}

#[test]
fn pins_only_config_uses_tuned_defaults() {
    let cfg = load_toml(PINS).expect("parse TOML");
    cfg.validate().expect("defaults are valid");
    assert_eq!(cfg.bands.dead, 10_000);
    assert_eq!(cfg.bands.saturate_threshold, 25_000);
    assert_eq!(cfg.bands.creep_duty, 32);
    assert_eq!(cfg.timing.period_ms, 39);
    assert_eq!(cfg.timing.forward_saturate_periods, 8);
    assert_eq!(cfg.timing.reverse_periods, 10);
    assert_eq!(cfg.tare.reference, 8_000_000);
    assert_eq!(cfg.tare.samples, 10);
    assert_eq!(cfg.pwm.resolution_bits, 10);
    assert!(cfg.has_encoder());
}

#[test]
fn missing_pins_section_is_a_parse_error() {
    let err = load_toml("[bands]\ndead = 1\n").expect_err("pins are required");
    assert!(err.to_string().contains("pins"));
}

#[test]
fn optional_inputs_may_be_omitted() {
    let toml = r#"
[pins]
hx711_dt = 6
hx711_sck = 10
motor_ina = 0
motor_inb = 1
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid without encoder/button/proximity");
    assert!(!cfg.has_encoder());
    assert!(cfg.pins.proximity.is_none());
}

#[rstest]
#[case("[bands]\ndead = 25000\nsaturate_threshold = 25000", "bands.dead must be < bands.saturate_threshold")]
#[case("[bands]\ndead = -1", "bands.dead must be >= 0")]
#[case("[bands]\ncreep_threshold = 30000", "creep_threshold must be <=")]
#[case("[bands]\ncreep_duty = 0", "bands.creep_duty must be > 0")]
#[case("[bands]\ncreep_duty = 900\nsaturate_duty = 800", "creep_duty must be <= bands.saturate_duty")]
#[case("[bands]\nsaturate_duty = 1024", "saturate_duty must be <= 1023")]
#[case("[timing]\nforward_saturate_periods = 0", "forward_saturate_periods must be >= 1")]
#[case("[timing]\nperiod_ms = 0", "period_ms must be >= 1")]
#[case("[tare]\nsamples = 0", "tare.samples must be >= 1")]
#[case("[tare]\nreference = 16777216", "24 bits")]
#[case("[pwm]\nresolution_bits = 0", "resolution_bits")]
#[case("[pwm]\nfrequency_hz = 0.0", "frequency_hz must be > 0")]
#[case("[hardware]\nsensor_read_timeout_ms = 0", "sensor_read_timeout_ms must be >= 1")]
#[case("[hardware]\nbit_delay_us = 80", "bit_delay_us")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation")]
fn rejects_out_of_range_values(#[case] section: &str, #[case] needle: &str) {
    let cfg = load_toml(&with_pins(section)).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    let msg = format!("{err}");
    assert!(msg.contains(needle), "{msg:?} does not mention {needle:?}");
}

#[rstest]
#[case("motor_ina = 0\nmotor_inb = 0", "must be different channels")]
#[case("motor_ina = 2\nmotor_inb = 1", "PWM channel 0 or 1")]
fn rejects_bad_motor_channels(#[case] motor: &str, #[case] needle: &str) {
    let toml = format!("[pins]\nhx711_dt = 6\nhx711_sck = 10\n{motor}\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(format!("{err}").contains(needle));
}

#[test]
fn half_wired_encoder_is_rejected() {
    let toml = "[pins]\nhx711_dt = 6\nhx711_sck = 10\nmotor_ina = 0\nmotor_inb = 1\nencoder_a = 7\n";
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("encoder_b missing");
    assert!(format!("{err}").contains("set together"));
}
