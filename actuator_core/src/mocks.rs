//! Test and helper mocks for actuator_core

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actuator_traits::{BoxError, Clock, EndStop, HBridge, SampleSource};

/// Replays a fixed list of reads. `None` entries fail like a data-ready
/// timeout; once the script runs out, `fallback` is returned (or a timeout).
pub struct ScriptedSensor {
    script: VecDeque<Option<u32>>,
    fallback: Option<u32>,
}

impl ScriptedSensor {
    pub fn new(script: impl IntoIterator<Item = Option<u32>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback: None,
        }
    }

    /// Always return `raw`.
    pub fn constant(raw: u32) -> Self {
        Self::new(Vec::<Option<u32>>::new()).then(raw)
    }

    pub fn then(mut self, raw: u32) -> Self {
        self.fallback = Some(raw);
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl SampleSource for ScriptedSensor {
    fn read_sample(&mut self, _timeout: Duration) -> Result<u32, BoxError> {
        let next = match self.script.pop_front() {
            Some(entry) => entry,
            None => self.fallback,
        };
        next.ok_or_else(|| "sensor timeout".into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeCmd {
    Forward(u32),
    Reverse(u32),
    Coast,
}

/// H-bridge that records every command. Clones share the log.
#[derive(Debug, Clone)]
pub struct RecordingBridge {
    log: Arc<Mutex<Vec<BridgeCmd>>>,
    max_duty: u32,
}

impl Default for RecordingBridge {
    fn default() -> Self {
        Self::new(1023)
    }
}

impl RecordingBridge {
    pub fn new(max_duty: u32) -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            max_duty,
        }
    }

    pub fn commands(&self) -> Vec<BridgeCmd> {
        self.log.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<BridgeCmd> {
        self.log.lock().ok().and_then(|g| g.last().copied())
    }

    fn record(&self, cmd: BridgeCmd) {
        if let Ok(mut g) = self.log.lock() {
            g.push(cmd);
        }
    }
}

impl HBridge for RecordingBridge {
    fn drive_forward(&mut self, duty: u32) -> Result<(), BoxError> {
        self.record(BridgeCmd::Forward(duty));
        Ok(())
    }
    fn drive_reverse(&mut self, duty: u32) -> Result<(), BoxError> {
        self.record(BridgeCmd::Reverse(duty));
        Ok(())
    }
    fn coast(&mut self) -> Result<(), BoxError> {
        self.record(BridgeCmd::Coast);
        Ok(())
    }
    fn max_duty(&self) -> u32 {
        self.max_duty
    }
}

/// End stop that fires a fixed time into each wait, or never.
/// Time passes on the supplied clock, so a virtual clock sees it too.
pub struct ScriptedEndStop {
    fire_after: Option<Duration>,
    clock: Arc<dyn Clock + Send + Sync>,
    clears: usize,
}

impl ScriptedEndStop {
    pub fn new(fire_after: Option<Duration>, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            fire_after,
            clock,
            clears: 0,
        }
    }

    pub fn clears(&self) -> usize {
        self.clears
    }
}

impl EndStop for ScriptedEndStop {
    fn clear(&mut self) {
        self.clears += 1;
    }

    fn wait(&mut self, timeout: Duration) -> bool {
        match self.fire_after {
            Some(at) if at <= timeout => {
                self.clock.sleep(at);
                true
            }
            _ => {
                self.clock.sleep(timeout);
                false
            }
        }
    }
}
