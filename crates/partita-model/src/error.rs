//! Error types for the partial data model and partial-file codec.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building or decoding partial data.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The byte stream is not a recognizable partial file.
    #[error("malformed partial file: {message}")]
    Malformed {
        /// What was wrong with the data.
        message: String,
    },

    /// The file ended in the middle of a structure.
    #[error(
        "truncated partial file: needed {needed} bytes at offset {offset}, {available} available"
    )]
    Truncated {
        /// Byte offset where the read was attempted.
        offset: usize,
        /// Bytes required.
        needed: usize,
        /// Bytes remaining.
        available: usize,
    },

    /// A value that must be finite was NaN or infinite.
    #[error("non-finite value for '{field}': {value}")]
    NonFinite {
        /// Which field held the value.
        field: &'static str,
        /// The offending value.
        value: f64,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModelError {
    /// Creates a malformed-data error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Returns a stable error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::Malformed { .. } => "MODEL_001",
            ModelError::Truncated { .. } => "MODEL_002",
            ModelError::NonFinite { .. } => "MODEL_003",
            ModelError::Io(_) => "MODEL_004",
        }
    }

    /// True for errors caused by the content of the data rather than the
    /// environment.
    pub fn is_malformed_input(&self) -> bool {
        !matches!(self, ModelError::Io(_))
    }
}
