//! Error types for the stroke analysis core.
//!
//! Every failure the library can surface is an [`AnalysisError`]. The
//! [`ErrorKind`] classification lets a request boundary tell a video with
//! nobody in it apart from a broken decoder or a caller bug.

use thiserror::Error;

/// A specialized `Result` type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AnalysisError {
    /// Aggregation was asked to reduce zero frames
    #[error("cannot {operation} over an empty frame sequence")]
    EmptyInput {
        /// The aggregation that was attempted
        operation: &'static str,
    },

    /// Not a single sampled frame produced a pose
    #[error("no pose detected in any of the {sampled} sampled frames")]
    NoPoseDetected {
        /// Number of frames the sampler produced
        sampled: usize,
    },

    /// The frame sampler could not decode the video
    #[error("video decoding failed: {0}")]
    Decode(String),

    /// The pose detector failed on a frame or while loading
    #[error("pose detector failed: {0}")]
    Detector(String),

    /// The text generator failed or could not be reached
    #[error("text generation failed: {0}")]
    TextGeneration(String),

    /// Request rejected before reaching the pipeline
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A wire payload did not match its contract
    #[error("invalid {what} at `{path}`: {message}")]
    Validation {
        /// Contract being checked
        what: &'static str,
        /// JSON path of the offending field
        path: String,
        /// What was wrong with it
        message: String,
    },

    /// The caller aborted the run between frames
    #[error("analysis cancelled after {processed} frames")]
    Cancelled {
        /// Frames processed before the abort was observed
        processed: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Coarse classification used when reporting an error to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Contract,
    NoDetection,
    Collaborator,
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::Input => "input",
            ErrorKind::Contract => "contract",
            ErrorKind::NoDetection => "no-detection",
            ErrorKind::Collaborator => "collaborator",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::InvalidInput(_) => ErrorKind::Input,
            AnalysisError::EmptyInput { .. } | AnalysisError::Validation { .. } => ErrorKind::Contract,
            AnalysisError::NoPoseDetected { .. } => ErrorKind::NoDetection,
            AnalysisError::Decode(_)
            | AnalysisError::Detector(_)
            | AnalysisError::TextGeneration(_)
            | AnalysisError::Io(_) => ErrorKind::Collaborator,
            AnalysisError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn validation(what: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::Validation {
            what,
            path: path.into(),
            message: message.into(),
        }
    }
}
