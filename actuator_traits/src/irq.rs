//! Interrupt-to-task plumbing.
//!
//! Interrupt handlers never do real work here. They post a value into a
//! single-slot [`Notifier`] (latest write wins) and return; a task blocked on
//! the paired [`NotifyWaiter`] does the rest. Handlers run through
//! [`InterruptGate::dispatch`], which the sensor driver holds closed for the
//! length of a bit-banged transfer, so edges arriving mid-transfer are
//! delivered afterwards instead of stealing time from the bit timing.
use crossbeam_channel as xch;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Which encoder line raised the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderPin {
    A,
    B,
}

/// Masks interrupt dispatch while a timing-critical section runs.
#[derive(Debug, Default)]
pub struct InterruptGate {
    lock: Mutex<()>,
}

impl InterruptGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn acquire(&self) -> MutexGuard<'_, ()> {
        // Nothing is stored behind the lock, so a poisoned guard is still usable.
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` with interrupt dispatch held off.
    pub fn critical<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.acquire();
        f()
    }

    /// Entry point for interrupt handlers. Waits out any critical section.
    pub fn dispatch(&self, f: impl FnOnce()) {
        let _guard = self.acquire();
        f();
    }
}

/// Create a connected single-slot notification pair.
pub fn notification<T>() -> (Notifier<T>, NotifyWaiter<T>) {
    let (tx, rx) = xch::bounded(1);
    (
        Notifier {
            tx,
            drain: rx.clone(),
        },
        NotifyWaiter { rx },
    )
}

/// Writing half; cheap to clone so several handlers can share one slot.
#[derive(Debug)]
pub struct Notifier<T> {
    tx: xch::Sender<T>,
    drain: xch::Receiver<T>,
}

impl<T> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            drain: self.drain.clone(),
        }
    }
}

impl<T> Notifier<T> {
    /// Overwrite the slot with `value`. Never blocks.
    pub fn notify(&self, mut value: T) {
        loop {
            match self.tx.try_send(value) {
                Ok(()) => return,
                Err(xch::TrySendError::Full(back)) => {
                    // The reader has not consumed the previous edge yet; replace it.
                    let _ = self.drain.try_recv();
                    value = back;
                }
                Err(xch::TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

/// Outcome of [`NotifyWaiter::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait<T> {
    Signal(T),
    TimedOut,
    /// Every notifier has been dropped; no value will ever arrive.
    Closed,
}

/// Reading half, owned by exactly one task.
#[derive(Debug)]
pub struct NotifyWaiter<T> {
    rx: xch::Receiver<T>,
}

impl<T> NotifyWaiter<T> {
    /// Block until a value arrives. `None` once every notifier is gone.
    pub fn wait(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Block for at most `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Like [`wait_timeout`](Self::wait_timeout), but tells a timeout apart
    /// from a closed channel so task loops can exit.
    pub fn poll(&self, timeout: Duration) -> Wait<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(v) => Wait::Signal(v),
            Err(xch::RecvTimeoutError::Timeout) => Wait::TimedOut,
            Err(xch::RecvTimeoutError::Disconnected) => Wait::Closed,
        }
    }

    /// Take the pending value without blocking.
    pub fn try_take(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Discard a pending value, if any.
    pub fn clear(&self) {
        let _ = self.rx.try_recv();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn latest_write_wins() {
        let (tx, rx) = notification::<EncoderPin>();
        tx.notify(EncoderPin::A);
        tx.notify(EncoderPin::B);
        assert_eq!(rx.try_take(), Some(EncoderPin::B));
        assert_eq!(rx.try_take(), None);
    }

    #[test]
    fn wait_timeout_expires_without_signal() {
        let (_tx, rx) = notification::<()>();
        let t = Instant::now();
        assert!(rx.wait_timeout(Duration::from_millis(5)).is_none());
        assert!(t.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn wait_returns_none_when_notifiers_dropped() {
        let (tx, rx) = notification::<()>();
        drop(tx);
        assert!(rx.wait().is_none());
    }

    #[test]
    fn poll_reports_closed_after_notifiers_dropped() {
        let (tx, rx) = notification::<u8>();
        tx.notify(3);
        assert_eq!(rx.poll(Duration::from_millis(1)), Wait::Signal(3));
        assert_eq!(rx.poll(Duration::from_millis(1)), Wait::TimedOut);
        drop(tx);
        assert_eq!(rx.poll(Duration::from_millis(1)), Wait::Closed);
    }

    #[test]
    fn clear_drops_stale_signal() {
        let (tx, rx) = notification::<()>();
        tx.notify(());
        rx.clear();
        assert!(rx.try_take().is_none());
    }

    #[test]
    fn dispatch_waits_for_critical_section() {
        let gate = Arc::new(InterruptGate::new());
        let (tx, rx) = notification::<u32>();
        let gate_bg = gate.clone();
        let seen = gate.critical(|| {
            let h = std::thread::spawn(move || gate_bg.dispatch(|| tx.notify(7)));
            std::thread::sleep(Duration::from_millis(10));
            let seen = rx.try_take();
            (seen, h)
        });
        let (inside, handle) = seen;
        assert_eq!(inside, None, "handler ran during critical section");
        let _ = handle.join();
        assert_eq!(rx.try_take(), Some(7));
    }
}
