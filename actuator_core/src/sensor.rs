//! Load cell shared between the controller and the tare task.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actuator_traits::{BoxError, SampleSource};

/// Serializes access to one sensor so a tare run and a control read never
/// interleave their bit-banged transfers.
pub struct SharedSensor<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for SharedSensor<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: SampleSource> SharedSensor<S> {
    pub fn new(sensor: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sensor)),
        }
    }

    /// Hold the sensor for several reads in a row.
    pub fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        // The driver keeps no invariant across a panic mid-read.
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

impl<S: SampleSource> SampleSource for SharedSensor<S> {
    fn read_sample(&mut self, timeout: Duration) -> Result<u32, BoxError> {
        self.with(|s| s.read_sample(timeout))
    }
}
