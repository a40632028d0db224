//! Error types shared across Slidecast crates.

use std::path::PathBuf;

/// Top-level error type for Slidecast operations.
///
/// The first six variants are the fatal pipeline failure kinds. Cleanup
/// problems are never raised through this type; they are collected by the
/// pipeline and reported alongside the result instead.
#[derive(Debug, thiserror::Error)]
pub enum SlidecastError {
    #[error("Extraction failed: {message}")]
    ExtractionFailed { message: String },

    #[error("Synthesis failed: {message}")]
    SynthesisFailed { message: String },

    #[error("Staging failed: {message}")]
    StagingFailed { message: String },

    #[error("Assembly failed: {message}")]
    AssemblyFailed { message: String },

    #[error("Workspace creation failed: {message}")]
    WorkspaceCreateFailed { message: String },

    #[error("Publish failed: {message}")]
    PublishFailed { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SlidecastError.
pub type SlidecastResult<T> = Result<T, SlidecastError>;

/// Coarse classification of a [`SlidecastError`], used in reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ExtractionFailed,
    SynthesisFailed,
    StagingFailed,
    AssemblyFailed,
    WorkspaceCreateFailed,
    PublishFailed,
    Config,
    NotFound,
    Unsupported,
    Io,
    Other,
}

impl SlidecastError {
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            message: msg.into(),
        }
    }

    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::SynthesisFailed {
            message: msg.into(),
        }
    }

    pub fn staging(msg: impl Into<String>) -> Self {
        Self::StagingFailed {
            message: msg.into(),
        }
    }

    pub fn assembly(msg: impl Into<String>) -> Self {
        Self::AssemblyFailed {
            message: msg.into(),
        }
    }

    pub fn workspace(msg: impl Into<String>) -> Self {
        Self::WorkspaceCreateFailed {
            message: msg.into(),
        }
    }

    pub fn publish(msg: impl Into<String>) -> Self {
        Self::PublishFailed {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ExtractionFailed { .. } => ErrorKind::ExtractionFailed,
            Self::SynthesisFailed { .. } => ErrorKind::SynthesisFailed,
            Self::StagingFailed { .. } => ErrorKind::StagingFailed,
            Self::AssemblyFailed { .. } => ErrorKind::AssemblyFailed,
            Self::WorkspaceCreateFailed { .. } => ErrorKind::WorkspaceCreateFailed,
            Self::PublishFailed { .. } => ErrorKind::PublishFailed,
            Self::Config { .. } => ErrorKind::Config,
            Self::FileNotFound { .. } => ErrorKind::NotFound,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) | Self::Other(_) => ErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_map_to_kinds() {
        assert_eq!(
            SlidecastError::extraction("x").kind(),
            ErrorKind::ExtractionFailed
        );
        assert_eq!(
            SlidecastError::synthesis("x").kind(),
            ErrorKind::SynthesisFailed
        );
        assert_eq!(SlidecastError::staging("x").kind(), ErrorKind::StagingFailed);
        assert_eq!(
            SlidecastError::assembly("x").kind(),
            ErrorKind::AssemblyFailed
        );
        assert_eq!(
            SlidecastError::workspace("x").kind(),
            ErrorKind::WorkspaceCreateFailed
        );
        assert_eq!(SlidecastError::publish("x").kind(), ErrorKind::PublishFailed);
    }

    #[test]
    fn test_display_carries_detail() {
        let err = SlidecastError::assembly("ffmpeg exited with status 1: bad codec");
        assert_eq!(
            err.to_string(),
            "Assembly failed: ffmpeg exited with status 1: bad codec"
        );
    }

    #[test]
    fn test_io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: SlidecastError = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
