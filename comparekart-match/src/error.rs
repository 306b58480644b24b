//! Error types for the comparekart-match crate.
//!
//! Two layers exist. [`SourceFault`] describes why a single source produced
//! nothing; it is absorbed by the orchestrator and only ever surfaces as data
//! on the response. [`CompareError`] is the request-level failure returned to
//! callers.

use std::time::Duration;

/// Why one source adapter produced no listings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceFault {
    /// The adapter did not answer within its own timeout.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The source refused the request (non-2xx, captcha, rate limit).
    #[error("blocked: {0}")]
    Blocked(String),

    /// Network, parse, or any other adapter-internal failure.
    #[error("failed: {0}")]
    Failed(String),

    /// The adapter task panicked or was aborted.
    #[error("adapter task panicked: {0}")]
    Panicked(String),

    /// No adapter is registered under the requested source id.
    #[error("unknown source")]
    UnknownSource,
}

/// Request-level errors for a comparison.
#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    /// The request itself is unusable (blank query, zero cap, no sources).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The caller cancelled the request before it completed.
    #[error("comparison cancelled")]
    Cancelled,

    /// Invalid matcher configuration.
    #[error("config error: {0}")]
    Config(String),

    /// An embedding or language-model backend call failed.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Convenience type alias for comparekart-match results.
pub type Result<T> = std::result::Result<T, CompareError>;
