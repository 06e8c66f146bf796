use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ActuatorError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("invalid bands: {0}")]
    InvalidBands(&'static str),
    #[error("invalid timing: {0}")]
    InvalidTiming(&'static str),
    #[error("duty {duty} exceeds pwm maximum {max}")]
    DutyOutOfRange { duty: u32, max: u32 },
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
