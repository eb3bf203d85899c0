//! Error types for the Term profiler.
//!
//! All fallible operations return [`ProfilerError`]. Configuration problems are
//! wrapped in the [`ProfilerError::Config`] variant and are always raised before
//! any column statistic is computed. Every other variant originates in the
//! dataset backend and is propagated unmodified.

use thiserror::Error;

use crate::config::ConfigError;

/// The main error type for the profiler.
#[derive(Error, Debug)]
pub enum ProfilerError {
    /// The supplied configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A column requested from the dataset does not exist.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A statistic could not be computed by the dataset backend.
    #[error("Backend error: {message}")]
    Backend {
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A type alias for `Result<T, ProfilerError>`.
pub type Result<T> = std::result::Result<T, ProfilerError>;

impl ProfilerError {
    /// Creates a backend error with the given message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a backend error wrapping an underlying error.
    pub fn backend_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Backend {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a column-not-found error.
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Returns `true` if this error was caused by the profiler configuration
    /// rather than by the dataset backend.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns the configuration error, if this is one.
    pub fn as_config_error(&self) -> Option<&ConfigError> {
        match self {
            Self::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ProfilerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
