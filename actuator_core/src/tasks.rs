//! Owned set of background tasks.
//!
//! Every task polls a shared shutdown flag at [`TASK_POLL`] granularity.
//! Dropping [`Tasks`] raises the flag and joins each thread, so no task
//! outlives the run that spawned it.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// Upper bound on how long a task takes to notice shutdown.
pub const TASK_POLL: Duration = Duration::from_millis(50);

#[derive(Default)]
pub struct Tasks {
    shutdown: Arc<AtomicBool>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Tasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag to hand to each spawned task.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn push(&mut self, name: &'static str, handle: JoinHandle<()>) {
        tracing::debug!(task = name, "task started");
        self.handles.push((name, handle));
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.handles.iter().map(|(n, _)| *n).collect()
    }
}

impl Drop for Tasks {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        for (name, handle) in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::warn!(task = name, "task panicked");
            } else {
                tracing::trace!(task = name, "task joined");
            }
        }
    }
}
