//! Error types for causal relationship extraction.

use thiserror::Error;

/// Top-level error type for the extraction pipeline.
///
/// Malformed model output is never an error: unparseable relationship
/// segments are dropped by the parser. Everything here is either a
/// configuration problem (reported before the model is touched) or a
/// model/runtime failure.
#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("Invalid decoding strategy '{value}': expected one of greedy, beam, sample")]
    InvalidStrategy { value: String },

    #[error("Invalid parameter {field}: {message}")]
    InvalidParameter { field: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Model not found: {path}")]
    ModelNotFound { path: String },

    #[error("Failed to load model: {message}")]
    ModelLoadError { message: String },

    #[error("Inference failed: {message}")]
    InferenceError { message: String },

    #[error("Model not loaded")]
    ModelNotLoaded,
}

impl DecoderError {
    /// Shorthand for an `InvalidParameter` error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an `InferenceError`.
    pub fn inference(message: impl Into<String>) -> Self {
        Self::InferenceError {
            message: message.into(),
        }
    }

    /// Whether this error was raised while validating configuration,
    /// i.e. before any model was invoked.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidStrategy { .. } | Self::InvalidParameter { .. } | Self::ConfigError(_)
        )
    }
}

impl From<config::ConfigError> for DecoderError {
    fn from(err: config::ConfigError) -> Self {
        DecoderError::ConfigError(err.to_string())
    }
}

/// Result type alias for extraction operations.
pub type DecoderResult<T> = Result<T, DecoderError>;
