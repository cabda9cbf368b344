use thiserror::Error;

/// Failures the tracking core can report.
///
/// Only `InvalidState` (from `start`) and the directory errors are meant to
/// reach the operator. Capture and transport failures are logged where they
/// happen and never abort a running session or the stop sequence.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("screen capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("employee id '{0}' not found")]
    EmployeeNotFound(String),

    #[error("no projects assigned to employee '{0}'")]
    NoProjectsAssigned(String),
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        TrackerError::TransportError(err.to_string())
    }
}

impl From<image::ImageError> for TrackerError {
    fn from(err: image::ImageError) -> Self {
        TrackerError::CaptureUnavailable(err.to_string())
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
