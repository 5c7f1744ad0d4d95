//! Error types for medial axis computation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for medial axis operations.
pub type MedialResult<T> = Result<T, MedialError>;

/// Errors that can occur while preparing or persisting a medial axis run.
///
/// The shrinking-ball solver itself never fails; every numerical edge case
/// has a defined fallback. These errors cover configuration and data.
#[derive(Debug, Error)]
pub enum MedialError {
    /// Input point cloud is empty.
    #[error("point cloud is empty")]
    EmptyPointCloud,

    /// Point and normal arrays have different lengths.
    #[error("mismatched input: {points} points but {normals} normals")]
    MismatchedLengths {
        /// Number of points.
        points: usize,
        /// Number of normals.
        normals: usize,
    },

    /// A point or normal has a NaN or infinite component.
    #[error("non-finite {what} at index {index}")]
    NonFiniteInput {
        /// Which array the value came from.
        what: &'static str,
        /// Row index of the offending value.
        index: usize,
    },

    /// Invalid computation parameters.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// An input file does not exist or cannot be opened.
    #[error("invalid input path: {path}")]
    InputNotFound {
        /// Path that could not be opened.
        path: PathBuf,
    },

    /// The output location cannot be written.
    #[error("invalid output path: {path}: {source}")]
    OutputNotWritable {
        /// Path that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A `.npy` file is malformed or holds an unsupported array.
    #[error("invalid array file {path}: {message}")]
    InvalidArray {
        /// Path of the array file.
        path: PathBuf,
        /// Description of what was invalid.
        message: String,
    },

    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MedialError {
    /// Create an invalid params error.
    #[must_use]
    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::InvalidParams(details.into())
    }

    /// Create an invalid array error for the given file.
    #[must_use]
    pub fn invalid_array(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidArray {
            path: path.into(),
            message: message.into(),
        }
    }
}
