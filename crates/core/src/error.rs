//! Error types for the insider coordination engine.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the insider coordination engine.
///
/// Row-level data problems (missing prices, unknown codes, bad dates) are
/// filtering policy and never surface here; only structural problems do.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (malformed table).
    #[error("Data error: {0}")]
    Data(String),

    /// A mandatory column is absent from the input table.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a missing column error.
    pub fn missing_column(name: impl Into<String>) -> Self {
        Error::MissingColumn(name.into())
    }
}
