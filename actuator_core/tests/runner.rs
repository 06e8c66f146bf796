use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use actuator_core::mocks::{BridgeCmd, RecordingBridge, ScriptedSensor};
use actuator_core::{EncoderWiring, RunParams, Timing, Wiring, run};
use actuator_traits::clock::test_clock::TestClock;
use actuator_traits::{Clock, EncoderPin, LevelInput, notification};

const REF: u32 = 8_000_000;
const BIAS: u32 = 50;

fn wiring(sensor: ScriptedSensor, bridge: RecordingBridge) -> Wiring<ScriptedSensor, RecordingBridge> {
    Wiring {
        sensor,
        bridge,
        encoder: None,
        proximity: None,
        button: None,
    }
}

/// Ten tare reads at rest, one push into creep, one past saturate, then rest.
fn one_press() -> ScriptedSensor {
    let rest = REF + BIAS;
    let tare = std::iter::repeat_n(Some(rest), 10);
    ScriptedSensor::new(tare.chain([Some(rest + 10_001), Some(rest + 40_000)])).then(rest)
}

#[test]
fn one_cycle_then_stop() {
    let clock = TestClock::new();
    let bridge = RecordingBridge::default();
    let params = RunParams {
        max_cycles: Some(1),
        ..RunParams::default()
    };
    let summary = run(
        wiring(one_press(), bridge.clone()),
        params,
        Arc::new(clock.clone()),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();

    assert_eq!(summary.cycles, 1);
    assert_eq!(summary.tare, BIAS as i32);
    assert!((summary.adjust - 1.0).abs() < f32::EPSILON);

    let cmds = bridge.commands();
    assert_eq!(cmds.first(), Some(&BridgeCmd::Coast));
    assert_eq!(cmds.last(), Some(&BridgeCmd::Coast));
    assert!(cmds.contains(&BridgeCmd::Reverse(1023)));

    // 10 x 100 ms tare, 500 settle, 312 stroke, 100 + 390 + 400 coast/reverse
    assert_eq!(clock.offset(), Duration::from_millis(1000 + 500 + 312 + 100 + 390 + 400));
}

#[test]
fn startup_tare_failure_is_fatal_and_motor_stays_off() {
    let bridge = RecordingBridge::default();
    let sensor = ScriptedSensor::new([Some(REF), None::<u32>]);
    let err = run(
        wiring(sensor, bridge.clone()),
        RunParams::default(),
        Arc::new(TestClock::new()),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "startup tare");
    assert_eq!(bridge.commands(), vec![BridgeCmd::Coast]);
}

#[test]
fn raised_shutdown_flag_stops_before_first_step() {
    let clock = TestClock::new();
    let bridge = RecordingBridge::default();
    let summary = run(
        wiring(ScriptedSensor::constant(REF), bridge.clone()),
        RunParams::default(),
        Arc::new(clock.clone()),
        Arc::new(AtomicBool::new(true)),
    )
    .unwrap();
    assert_eq!(summary.cycles, 0);
    assert_eq!(clock.offset(), Duration::from_secs(1), "only the tare ran");
    assert_eq!(bridge.commands(), vec![BridgeCmd::Coast, BridgeCmd::Coast]);
}

struct Fixed(bool);
impl LevelInput for Fixed {
    fn is_high(&self) -> bool {
        self.0
    }
}

#[test]
fn optional_inputs_start_and_stop_with_the_run() {
    let (_edges_tx, edges_rx) = notification::<EncoderPin>();
    let (_prox_tx, prox_rx) = notification::<()>();
    let (_button_tx, button_rx) = notification::<()>();
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(TestClock::new());
    let timing = Timing {
        forward_saturate_periods: 1,
        ..Timing::default()
    };
    let w = Wiring {
        sensor: one_press(),
        bridge: RecordingBridge::default(),
        encoder: Some(EncoderWiring {
            a: Box::new(Fixed(false)),
            b: Box::new(Fixed(false)),
            edges: edges_rx,
        }),
        proximity: Some(prox_rx),
        button: Some(button_rx),
    };
    let params = RunParams {
        timing,
        max_cycles: Some(1),
        ..RunParams::default()
    };
    let summary = run(w, params, clock, Arc::new(AtomicBool::new(false))).unwrap();
    assert_eq!(summary.cycles, 1);
}
