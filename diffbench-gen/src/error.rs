//! Generator errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while generating or persisting edit pairs
#[derive(Debug, Error)]
pub enum GenError {
    /// Caller error: bad strategy, distribution, or partition precondition
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl GenError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        GenError::InvalidConfiguration(message.into())
    }
}
