//! Error types for the comparekart application layer.

use comparekart_match::CompareError;

/// Top-level error type for the price comparison service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No registered source matched the selection.
    #[error("no valid sources selected")]
    NoSources,

    /// A single-source search named a source that is not registered.
    #[error("unsupported source: {0}")]
    UnknownSource(String),

    /// A single-source search failed.
    #[error("source {source_id} failed: {reason}")]
    Source { source_id: String, reason: String },

    /// Comparison engine error.
    #[error(transparent)]
    Compare(#[from] CompareError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;
