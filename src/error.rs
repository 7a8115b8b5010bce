//! DataVeil error types

use thiserror::Error;

/// DataVeil error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source API error
    #[error("Source error: {0}")]
    Source(String),

    /// Filter engine error
    #[error("Filter error: {0}")]
    Filter(String),

    /// Export error
    #[error("Export error: {0}")]
    Export(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for DataVeil operations
pub type Result<T> = std::result::Result<T, Error>;
