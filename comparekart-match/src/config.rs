//! Matcher configuration with sensible defaults.
//!
//! [`MatchConfig`] controls the similarity threshold, per-source result caps,
//! adapter timeouts, and the feature vector dimension used in degraded mode.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CompareError;

/// Configuration for the matching engine.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum cosine similarity between a cluster seed and a candidate.
    pub similarity_threshold: f32,
    /// Result cap applied when a request does not specify one.
    pub max_results_per_source: usize,
    /// Default timeout for adapters that do not declare their own.
    pub source_timeout_seconds: u64,
    /// Length of the zero vector used when embeddings are unavailable.
    pub embedding_dimensions: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.75,
            max_results_per_source: 5,
            source_timeout_seconds: 20,
            embedding_dimensions: 1536,
        }
    }
}

impl MatchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `similarity_threshold` must lie in `(0, 1]`
    /// - `max_results_per_source` must be greater than 0
    /// - `source_timeout_seconds` must be greater than 0
    /// - `embedding_dimensions` must be greater than 0
    pub fn validate(&self) -> Result<(), CompareError> {
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(CompareError::Config(
                "similarity_threshold must be in (0, 1]".into(),
            ));
        }
        if self.max_results_per_source == 0 {
            return Err(CompareError::Config(
                "max_results_per_source must be greater than 0".into(),
            ));
        }
        if self.source_timeout_seconds == 0 {
            return Err(CompareError::Config(
                "source_timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.embedding_dimensions == 0 {
            return Err(CompareError::Config(
                "embedding_dimensions must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Default adapter timeout as a [`Duration`].
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_seconds)
    }
}
