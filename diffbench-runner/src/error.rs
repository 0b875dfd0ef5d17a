//! Runner Errors

use std::time::Duration;
use thiserror::Error;

/// Failure of one external-program invocation or measurement
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The process could not be started or its pipes failed
    #[error("failed to run external program: {0}")]
    Spawn(#[from] std::io::Error),

    /// Exit status outside the allowed set. `code` is `None` when the process
    /// was killed by a signal.
    #[error("{program} exited with {}: {stderr}", .code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}")))]
    ExitCode {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Expected output fields were never printed
    #[error("missing output fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// An output field was printed more than once
    #[error("output field {0} matched more than once")]
    DuplicateField(String),

    /// A field matched but its value could not be extracted
    #[error("could not extract output field {key}: {message}")]
    FieldExtraction { key: String, message: String },

    /// The process exceeded its time limit and was torn down
    #[error("timed out after {after:?}")]
    Timeout { after: Duration },

    /// Operator cancellation
    #[error("cancelled")]
    Cancelled,

    /// Caller-supplied settings are unusable
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl RunnerError {
    /// Whether this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, RunnerError::Timeout { .. })
    }

    /// Whether this is an operator cancellation
    pub fn is_cancellation(&self) -> bool {
        matches!(self, RunnerError::Cancelled)
    }
}
