//! Error handling module for clipsmith

use thiserror::Error;

/// Main error type for clipsmith operations
#[derive(Error, Debug)]
pub enum ClipError {
    /// Input file not found or inaccessible
    #[error("Input file not found: {path}")]
    InputFileNotFound { path: String },

    /// Invalid time format
    #[error("Invalid time format: {time}. Expected HH:MM:SS.ms, MM:SS.ms, or seconds")]
    InvalidTimeFormat { time: String },

    /// Malformed clip interval
    #[error("Invalid clip range: end ({end_ms}ms) must be after start ({start_ms}ms)")]
    InvalidClipRange { start_ms: u64, end_ms: u64 },

    /// Clip end marked without a pending start
    #[error("No start mark set before end mark")]
    NoPendingStart,

    /// Media probe error
    #[error("Failed to probe media file: {message}")]
    ProbeError { message: String },

    /// External tool exited with a nonzero status
    #[error("{tool} exited with status {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: i32,
        stderr: String,
    },

    /// Analysis pass failure
    #[error("Analysis failed: {message}")]
    AnalysisError { message: String },

    /// Transcription collaborator failure
    #[error("Transcription failed: {message}")]
    TranscriptionError { message: String },

    /// An export stage exhausted its retry budget
    #[error("Export stage '{stage}' failed after {attempts} attempts: {message}")]
    StageFailed {
        stage: String,
        attempts: u32,
        message: String,
    },

    /// Export job failure outside any single stage
    #[error("Export failed: {message}")]
    ExportFailed { message: String },

    /// Not enough free disk space for the requested export
    #[error("Insufficient disk space: required {required} bytes, available {available} bytes")]
    InsufficientDiskSpace { required: u64, available: u64 },

    /// Configuration file error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Broad failure classes surfaced to users (fix input vs retried vs fatal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller input problem; never retried
    Validation,
    /// Transient external-tool problem; retried automatically before surfacing
    Transient,
    /// Resource exhaustion; not retryable
    Resource,
    /// Everything else
    Fatal,
}

impl ClipError {
    /// Classify this error for user-facing reporting
    pub fn class(&self) -> ErrorClass {
        match self {
            ClipError::InputFileNotFound { .. }
            | ClipError::InvalidTimeFormat { .. }
            | ClipError::InvalidClipRange { .. }
            | ClipError::NoPendingStart
            | ClipError::ConfigError { .. } => ErrorClass::Validation,
            ClipError::ToolFailed { .. } => ErrorClass::Transient,
            ClipError::InsufficientDiskSpace { .. } => ErrorClass::Resource,
            _ => ErrorClass::Fatal,
        }
    }
}

/// Result type alias for clipsmith operations
pub type ClipResult<T> = std::result::Result<T, ClipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let validation = ClipError::InvalidClipRange {
            start_ms: 1000,
            end_ms: 500,
        };
        assert_eq!(validation.class(), ErrorClass::Validation);

        let transient = ClipError::ToolFailed {
            tool: "ffmpeg".to_string(),
            status: 1,
            stderr: "Conversion failed!".to_string(),
        };
        assert_eq!(transient.class(), ErrorClass::Transient);

        let resource = ClipError::InsufficientDiskSpace {
            required: 100,
            available: 10,
        };
        assert_eq!(resource.class(), ErrorClass::Resource);
    }

    #[test]
    fn test_error_messages_are_distinct() {
        let err = ClipError::InvalidClipRange {
            start_ms: 2000,
            end_ms: 1000,
        };
        assert!(err.to_string().contains("end (1000ms)"));

        let err = ClipError::StageFailed {
            stage: "base_cut".to_string(),
            attempts: 3,
            message: "boom".to_string(),
        };
        assert!(err.to_string().contains("base_cut"));
        assert!(err.to_string().contains("3 attempts"));
    }
}
