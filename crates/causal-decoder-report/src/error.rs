//! Error types for test-report classification.

use thiserror::Error;

/// Errors raised while turning a result stream into report rows.
///
/// Line numbers are 1-based positions in the input stream.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Line {line}: fullName '{full_name}' has {found} fields, expected {expected}")]
    MalformedKey {
        line: usize,
        full_name: String,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: invalid test result record: {message}")]
    InvalidRecord { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// Line number the error refers to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::MalformedKey { line, .. } | Self::InvalidRecord { line, .. } => Some(*line),
            Self::Io(_) => None,
        }
    }

    /// Attach the input line a record came from.
    pub fn at_line(self, at: usize) -> Self {
        match self {
            Self::MalformedKey {
                full_name,
                expected,
                found,
                ..
            } => Self::MalformedKey {
                line: at,
                full_name,
                expected,
                found,
            },
            Self::InvalidRecord { message, .. } => Self::InvalidRecord { line: at, message },
            other => other,
        }
    }
}

/// Result type alias for report operations.
pub type ReportResult<T> = Result<T, ReportError>;
