//! Rotary encoder decoding.
//!
//! Both encoder lines interrupt on a falling edge. A rotation step is counted
//! only when *both* line levels differ from the last recorded pair, which
//! rejects contact bounce on a single line. The line whose edge completed the
//! step gives the direction.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use actuator_traits::{EncoderPin, LevelInput, NotifyWaiter, Wait};
use crossbeam_channel as xch;

use crate::tasks::TASK_POLL;

/// Capacity of the rotation event queue.
pub const ROTATION_QUEUE_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationEvent {
    Clockwise,
    CounterClockwise,
}

impl RotationEvent {
    fn from_trigger(pin: EncoderPin) -> Self {
        match pin {
            EncoderPin::A => RotationEvent::Clockwise,
            EncoderPin::B => RotationEvent::CounterClockwise,
        }
    }
}

/// Last observed encoder levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadratureDecoder {
    last_a: bool,
    last_b: bool,
}

impl QuadratureDecoder {
    /// Start from the levels read at power-up.
    pub fn new(a: bool, b: bool) -> Self {
        Self {
            last_a: a,
            last_b: b,
        }
    }

    /// Feed one edge notification with the levels sampled after it.
    pub fn on_edge(&mut self, trigger: EncoderPin, a: bool, b: bool) -> Option<RotationEvent> {
        let stepped = a != self.last_a && b != self.last_b;
        self.last_a = a;
        self.last_b = b;
        stepped.then(|| RotationEvent::from_trigger(trigger))
    }
}

/// Bounded queue between the decoder and the regulator.
pub fn rotation_channel() -> (xch::Sender<RotationEvent>, xch::Receiver<RotationEvent>) {
    xch::bounded(ROTATION_QUEUE_DEPTH)
}

/// Decode encoder edges into rotation events until shutdown.
///
/// A full queue drops the event; the wheel is a coarse user input and a lost
/// detent is harmless.
pub fn spawn_decoder<LA, LB>(
    a: LA,
    b: LB,
    edges: NotifyWaiter<EncoderPin>,
    events: xch::Sender<RotationEvent>,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>>
where
    LA: LevelInput + Send + 'static,
    LB: LevelInput + Send + 'static,
{
    std::thread::Builder::new()
        .name("encoder-decode".into())
        .spawn(move || {
            let mut decoder = QuadratureDecoder::new(a.is_high(), b.is_high());
            while !shutdown.load(Ordering::Relaxed) {
                let trigger = match edges.poll(TASK_POLL) {
                    Wait::Signal(pin) => pin,
                    Wait::TimedOut => continue,
                    Wait::Closed => break,
                };
                let Some(event) = decoder.on_edge(trigger, a.is_high(), b.is_high()) else {
                    continue;
                };
                match events.try_send(event) {
                    Ok(()) => tracing::trace!(?event, "rotation"),
                    Err(xch::TrySendError::Full(_)) => {
                        tracing::debug!(?event, "rotation queue full; event dropped");
                    }
                    Err(xch::TrySendError::Disconnected(_)) => break,
                }
            }
            tracing::trace!("encoder decoder exiting");
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_change_is_ignored() {
        let mut d = QuadratureDecoder::new(true, true);
        assert_eq!(d.on_edge(EncoderPin::A, false, true), None);
        // the glitch still moved the recorded levels
        assert_eq!(d, QuadratureDecoder::new(false, true));
    }

    #[test]
    fn trigger_line_picks_direction() {
        let mut d = QuadratureDecoder::new(true, true);
        assert_eq!(
            d.on_edge(EncoderPin::A, false, false),
            Some(RotationEvent::Clockwise)
        );
        assert_eq!(
            d.on_edge(EncoderPin::B, true, true),
            Some(RotationEvent::CounterClockwise)
        );
    }
}
