use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use actuator_core::quadrature::{ROTATION_QUEUE_DEPTH, rotation_channel, spawn_decoder};
use actuator_core::{QuadratureDecoder, RotationEvent};
use actuator_traits::{EncoderPin, LevelInput, notification};
use rstest::rstest;

#[derive(Clone, Default)]
struct Line(Arc<AtomicBool>);

impl Line {
    fn set(&self, high: bool) {
        self.0.store(high, Ordering::SeqCst);
    }
}

impl LevelInput for Line {
    fn is_high(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[rstest]
#[case(EncoderPin::A, RotationEvent::Clockwise)]
#[case(EncoderPin::B, RotationEvent::CounterClockwise)]
fn step_direction_follows_trigger(#[case] trigger: EncoderPin, #[case] expected: RotationEvent) {
    let mut d = QuadratureDecoder::new(false, false);
    assert_eq!(d.on_edge(trigger, true, true), Some(expected));
}

#[test]
fn bounce_on_one_line_never_steps() {
    let mut d = QuadratureDecoder::new(true, true);
    for _ in 0..5 {
        assert_eq!(d.on_edge(EncoderPin::A, false, true), None);
        assert_eq!(d.on_edge(EncoderPin::A, true, true), None);
    }
}

#[test]
fn levels_update_even_without_a_step() {
    let mut d = QuadratureDecoder::new(true, true);
    assert_eq!(d.on_edge(EncoderPin::A, false, true), None);
    // only B differs from the updated (false, true)
    assert_eq!(d.on_edge(EncoderPin::B, false, false), None);
    assert_eq!(d.on_edge(EncoderPin::B, true, true), Some(RotationEvent::CounterClockwise));
}

fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

#[test]
fn decoder_task_emits_events_and_drops_on_full_queue() {
    let (a, b) = (Line::default(), Line::default());
    let (edges_tx, edges_rx) = notification::<EncoderPin>();
    let (tx, rx) = rotation_channel();
    let shutdown = Arc::new(AtomicBool::new(false));
    let h = spawn_decoder(a.clone(), b.clone(), edges_rx, tx, shutdown.clone()).unwrap();

    // glitch: only A moves
    a.set(true);
    edges_tx.notify(EncoderPin::A);
    std::thread::sleep(Duration::from_millis(100));
    assert!(rx.is_empty());

    let mut level = true;
    for i in 0..ROTATION_QUEUE_DEPTH + 3 {
        level = !level;
        a.set(level);
        b.set(!level);
        edges_tx.notify(EncoderPin::A);
        let want = (i + 1).min(ROTATION_QUEUE_DEPTH);
        // wait until the decoder consumed this edge before moving the lines again
        assert!(wait_for(|| rx.len() >= want));
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(rx.len(), ROTATION_QUEUE_DEPTH);
    assert!(rx.try_iter().all(|e| e == RotationEvent::Clockwise));

    shutdown.store(true, Ordering::Relaxed);
    h.join().unwrap();
}
