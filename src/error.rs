//! Error handling for voxfx
//!
//! Every error carries enough context (stage, parameter) to diagnose a failed
//! run without inspecting internals, plus a recovery hint for the CLI.

use thiserror::Error;

/// Result type alias for voxfx operations
pub type Result<T> = std::result::Result<T, VoxError>;

/// Main error type for voxfx operations
#[derive(Error, Debug)]
pub enum VoxError {
    // Input Errors
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    // Stage Errors
    #[error("Configuration error in {stage} ({parameter}): {reason}")]
    Configuration {
        stage: &'static str,
        parameter: String,
        reason: String,
    },

    #[error("Numeric anomaly after {stage}: non-finite sample at index {index}")]
    NumericAnomaly { stage: &'static str, index: usize },

    #[error("Processing cancelled before {stage}")]
    Cancelled { stage: &'static str },

    // File Errors
    #[error("Audio file error: {path}")]
    Audio {
        path: String,
        #[source]
        source: hound::Error,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VoxError {
    /// Shorthand for a configuration error raised by a stage
    pub fn config(
        stage: &'static str,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        VoxError::Configuration {
            stage,
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            VoxError::InvalidInput { .. } => "INVALID_INPUT",
            VoxError::Configuration { .. } => "CONFIGURATION_ERROR",
            VoxError::NumericAnomaly { .. } => "NUMERIC_ANOMALY",
            VoxError::Cancelled { .. } => "CANCELLED",
            VoxError::Audio { .. } => "AUDIO_FILE_ERROR",
            VoxError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            VoxError::Io(_) => "IO_ERROR",
            VoxError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Get a suggested recovery action for this error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            VoxError::InvalidInput { .. } => "Load a non-empty mono buffer with a positive sample rate",
            VoxError::Configuration { .. } => {
                "Adjust the named parameter, or use audio with a higher sample rate"
            }
            VoxError::NumericAnomaly { .. } => "The effect settings may be too extreme; reduce them",
            VoxError::Cancelled { .. } => "Increase the timeout or process a shorter clip",
            VoxError::Audio { .. } => "Check that the file exists and is a valid WAV file",
            VoxError::UnsupportedFormat { .. } => "Convert to WAV (16/24-bit int or 32-bit float)",
            _ => "Check the error details and try again",
        }
    }
}
