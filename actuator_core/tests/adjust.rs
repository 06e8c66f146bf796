use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use actuator_core::adjust::{MAX_TENTHS, MIN_TENTHS, spawn_regulator};
use actuator_core::quadrature::rotation_channel;
use actuator_core::{AdjustFactor, RotationEvent};
use proptest::prelude::*;

use RotationEvent::{Clockwise as Cw, CounterClockwise as Ccw};

fn at(tenths: u32) -> AdjustFactor {
    let f = AdjustFactor::new();
    while f.tenths() < tenths {
        f.apply(Cw);
    }
    while f.tenths() > tenths {
        f.apply(Ccw);
    }
    f
}

#[test]
fn increments_clamp_at_ten() {
    let f = at(95);
    for _ in 0..11 {
        f.apply(Cw);
    }
    assert_eq!(f.tenths(), MAX_TENTHS);
    assert!((f.get() - 10.0).abs() < f32::EPSILON);
}

#[test]
fn eleven_increments_from_unity_do_not_clamp() {
    let f = AdjustFactor::new();
    for _ in 0..11 {
        f.apply(Cw);
    }
    assert_eq!(f.tenths(), 21);
}

#[test]
fn decrements_clamp_at_one_tenth() {
    let f = AdjustFactor::new();
    for _ in 0..150 {
        f.apply(Ccw);
    }
    assert_eq!(f.tenths(), MIN_TENTHS);
    assert!((f.get() - 0.1).abs() < 1e-6);
}

#[test]
fn reset_returns_to_unity() {
    let f = at(37);
    f.reset();
    assert_eq!(f.tenths(), 10);
    assert_eq!(f.scale(Duration::from_millis(312)), Duration::from_millis(312));
}

#[test]
fn regulator_applies_queued_events() {
    let (tx, rx) = rotation_channel();
    let factor = Arc::new(AdjustFactor::new());
    let shutdown = Arc::new(AtomicBool::new(false));
    let h = spawn_regulator(rx, factor.clone(), shutdown).unwrap();

    for e in [Cw, Cw, Cw, Ccw] {
        tx.send(e).unwrap();
    }
    let deadline = Instant::now() + Duration::from_secs(2);
    while factor.tenths() != 12 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(factor.tenths(), 12);

    drop(tx);
    h.join().unwrap();
}

proptest! {
    #[test]
    fn factor_tracks_a_clamped_counter(steps in proptest::collection::vec(any::<bool>(), 0..400)) {
        let f = AdjustFactor::new();
        let mut model: i64 = 10;
        for cw in steps {
            f.apply(if cw { Cw } else { Ccw });
            model = if cw { (model + 1).min(100) } else { (model - 1).max(1) };
            prop_assert!((MIN_TENTHS..=MAX_TENTHS).contains(&f.tenths()));
        }
        prop_assert_eq!(i64::from(f.tenths()), model);
    }
}
