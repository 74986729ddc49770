//! Error types for performance collection and reporting.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while collecting or reporting performance data.
#[derive(Debug, Error)]
pub enum PerfLoggerError {
    /// Mismatched start/stop calls on a collector
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Existing log file content is not a JSON array of log entries
    #[error("Failed to deserialize log file {}: {source}", .path.display())]
    Deserialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to serialize performance data
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Directory creation, read or write failure
    #[error("Filesystem error on {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Logger configuration could not be loaded
    #[error("Invalid configuration {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    /// More than one registered logger failed during teardown
    #[error("{} loggers failed to report: {}", .0.len(), join_errors(.0))]
    AggregateReport(Vec<PerfLoggerError>),
}

impl PerfLoggerError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Individual failures carried by this error.
    ///
    /// An aggregate yields its members; any other error yields itself.
    pub fn failures(&self) -> Vec<&PerfLoggerError> {
        match self {
            Self::AggregateReport(errors) => errors.iter().collect(),
            other => vec![other],
        }
    }
}

fn join_errors(errors: &[PerfLoggerError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for performance logger operations.
pub type PerfResult<T> = Result<T, PerfLoggerError>;
