use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};

use actuator_hardware::error::HwError;
use actuator_hardware::util::{spin_for, wait_until_low_with_timeout};
use rstest::rstest;

#[test]
fn data_ready_edge_ends_the_wait() {
    let high = Arc::new(AtomicBool::new(true));
    let high_bg = high.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        high_bg.store(false, Ordering::Relaxed);
    });

    let res = wait_until_low_with_timeout(
        || high.load(Ordering::Relaxed),
        Duration::from_millis(200),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
}

#[test]
fn stalled_sensor_reports_not_ready() {
    let high = Arc::new(AtomicBool::new(true));

    let err = wait_until_low_with_timeout(
        || high.load(Ordering::Relaxed),
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .expect_err("expected timeout error");

    match err {
        HwError::DataReadyTimeout => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[rstest]
#[case(Duration::ZERO)]
#[case(Duration::from_micros(20))]
#[case(Duration::from_micros(200))]
fn spin_holds_at_least_requested(#[case] d: Duration) {
    let t = Instant::now();
    spin_for(d);
    assert!(t.elapsed() >= d);
}
