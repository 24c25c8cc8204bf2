use thiserror::Error;

/// Failures surfaced by the signal pipeline.
#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("threshold {0:.2} outside [0.05, 0.95]")]
    ThresholdOutOfRange(f64),

    #[error("{name} must be a finite, non-negative duration (got {value})")]
    InvalidDuration { name: &'static str, value: f64 },

    #[error("face detector failed: {0}")]
    Detector(String),
}
