//! Error types for the spectral modeling engine.

use partita_model::ModelError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by analysis, synthesis, morphing and partial-file I/O.
///
/// Empty inputs are never errors; they produce empty outputs.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A parameter is outside its valid domain. Raised before any work is done.
    #[error("invalid configuration '{name}': {message}")]
    Configuration {
        /// Parameter name.
        name: String,
        /// Error message.
        message: String,
    },

    /// Input data could not be interpreted.
    #[error("malformed input: {message}")]
    MalformedInput {
        /// Error message.
        message: String,
    },

    /// A numeric input was NaN or infinite.
    #[error("non-finite value in {context}")]
    NonFinite {
        /// Where the value was found.
        context: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Creates a configuration error.
    pub fn config(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a malformed-input error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    /// Creates a non-finite-value error.
    pub fn non_finite(context: impl Into<String>) -> Self {
        Self::NonFinite {
            context: context.into(),
        }
    }

    /// Stable error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Configuration { .. } => "PARTITA_001",
            EngineError::MalformedInput { .. } => "PARTITA_002",
            EngineError::NonFinite { .. } => "PARTITA_003",
            EngineError::Io(_) => "PARTITA_004",
        }
    }

    /// Error category for grouping related errors.
    pub fn category(&self) -> &'static str {
        match self {
            EngineError::Configuration { .. } => "configuration",
            EngineError::MalformedInput { .. } | EngineError::NonFinite { .. } => "input",
            EngineError::Io(_) => "io",
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, EngineError::Configuration { .. })
    }

    /// True for malformed data, including non-finite samples.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            EngineError::MalformedInput { .. } | EngineError::NonFinite { .. }
        )
    }
}

impl From<ModelError> for EngineError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Io(io) => EngineError::Io(io),
            other => EngineError::malformed(other.to_string()),
        }
    }
}

/// Checks that `value` is finite and strictly positive.
pub(crate) fn require_positive(name: &str, value: f64) -> EngineResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::config(
            name,
            format!("must be a positive finite number, got {}", value),
        ))
    }
}

/// Checks that `value` is finite and not negative.
pub(crate) fn require_non_negative(name: &str, value: f64) -> EngineResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::config(
            name,
            format!("must be a non-negative finite number, got {}", value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_helper() {
        let err = EngineError::config("hop_time", "must be positive");
        assert!(err.to_string().contains("hop_time"));
        assert!(err.is_configuration());
        assert_eq!(err.code(), "PARTITA_001");
        assert_eq!(err.category(), "configuration");
    }

    #[test]
    fn test_model_errors_become_malformed_input() {
        let err: EngineError = ModelError::malformed("bad magic").into();
        assert!(err.is_malformed_input());
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn test_model_io_stays_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EngineError = ModelError::Io(io).into();
        assert_eq!(err.code(), "PARTITA_004");
    }

    #[test]
    fn test_require_positive() {
        assert!(require_positive("x", 1.0).is_ok());
        assert!(require_positive("x", 0.0).is_err());
        assert!(require_positive("x", f64::NAN).is_err());
        assert!(require_non_negative("x", 0.0).is_ok());
        assert!(require_non_negative("x", -1e-9).is_err());
    }
}
