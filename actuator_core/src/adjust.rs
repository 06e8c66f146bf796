//! User adjust factor, driven by the rotary encoder.
//!
//! The factor scales the saturate timeout and the reverse time. It is kept
//! as an integer number of tenths so repeated ±0.1 steps never drift.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel as xch;

use crate::quadrature::RotationEvent;
use crate::tasks::TASK_POLL;
use crate::util::scale_tenths;

pub const MIN_TENTHS: u32 = 1;
pub const MAX_TENTHS: u32 = 100;
pub const UNITY_TENTHS: u32 = 10;

/// Multiplier in `[0.1, 10.0]`, default 1.0.
///
/// Written by the regulator and tare tasks, read by the controller; a plain
/// atomic is enough since readers only need some recent value.
#[derive(Debug)]
pub struct AdjustFactor {
    tenths: AtomicU32,
}

impl Default for AdjustFactor {
    fn default() -> Self {
        Self::new()
    }
}

impl AdjustFactor {
    pub fn new() -> Self {
        Self {
            tenths: AtomicU32::new(UNITY_TENTHS),
        }
    }

    pub fn get(&self) -> f32 {
        self.tenths() as f32 / 10.0
    }

    pub fn tenths(&self) -> u32 {
        self.tenths.load(Ordering::Relaxed)
    }

    /// Step by ±0.1, clamped to the valid range. Returns the new value in tenths.
    pub fn apply(&self, event: RotationEvent) -> u32 {
        let step = |t: u32| match event {
            RotationEvent::Clockwise => (t + 1).min(MAX_TENTHS),
            RotationEvent::CounterClockwise => t.saturating_sub(1).max(MIN_TENTHS),
        };
        let prev = self
            .tenths
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |t| Some(step(t)))
            .unwrap_or_else(|t| t);
        step(prev)
    }

    pub fn reset(&self) {
        self.tenths.store(UNITY_TENTHS, Ordering::Relaxed);
    }

    /// `d * factor`.
    pub fn scale(&self, d: Duration) -> Duration {
        scale_tenths(d, self.tenths())
    }
}

/// Apply rotation events to `factor` until shutdown or the decoder goes away.
pub fn spawn_regulator(
    events: xch::Receiver<RotationEvent>,
    factor: Arc<AdjustFactor>,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("adjust-regulator".into())
        .spawn(move || {
            while !shutdown.load(Ordering::Relaxed) {
                match events.recv_timeout(TASK_POLL) {
                    Ok(event) => {
                        let tenths = factor.apply(event);
                        tracing::info!(adjust = tenths as f32 / 10.0, "adjust factor");
                    }
                    Err(xch::RecvTimeoutError::Timeout) => {}
                    Err(xch::RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::trace!("adjust regulator exiting");
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_unity() {
        let f = AdjustFactor::new();
        assert_eq!(f.tenths(), 10);
        assert!((f.get() - 1.0).abs() < f32::EPSILON);
        assert_eq!(f.scale(Duration::from_millis(390)), Duration::from_millis(390));
    }

    #[test]
    fn apply_returns_new_value() {
        let f = AdjustFactor::new();
        assert_eq!(f.apply(RotationEvent::Clockwise), 11);
        assert_eq!(f.apply(RotationEvent::CounterClockwise), 10);
    }
}
