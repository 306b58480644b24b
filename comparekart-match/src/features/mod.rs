//! Feature extraction: normalised titles to comparable vectors.
//!
//! Titles are embedded in a single batched call to an [`EmbeddingBackend`].
//! When the backend is missing or misbehaves, every title gets a zero vector
//! and the result is flagged as degraded. Zero vectors have cosine similarity
//! 0 with everything, so a degraded request clusters nothing together.

pub mod lexical;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::CompareError;

pub use lexical::LexicalEmbedder;

/// A batched text embedding service.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Embed every text, returning one vector per input in input order.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::Backend`] if the service is unreachable,
    /// rejects the request, or answers with an unexpected shape.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CompareError>;
}

/// Numeric representation of a normalised title.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// The "no signal" vector.
    pub fn zeros(dimensions: usize) -> Self {
        Self(vec![0.0; dimensions])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the vector carries no signal.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }

    /// Cosine similarity with `other`. See [`cosine_similarity`].
    pub fn cosine(&self, other: &Self) -> f32 {
        cosine_similarity(&self.0, &other.0)
    }
}

/// Cosine similarity of two vectors: `a·b / (|a| |b|)`.
///
/// Defined as 0 when either magnitude is zero, when the lengths differ, or
/// when the inputs contain non-finite values; the result is never NaN and is
/// clamped to `[-1, 1]`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !similarity.is_finite() {
        return 0.0;
    }
    similarity.clamp(-1.0, 1.0) as f32
}

/// Vectors for one request, in title order.
#[derive(Debug, Clone)]
pub struct Features {
    pub vectors: Vec<FeatureVector>,
    /// True when the backend could not be used and every vector is zero.
    pub degraded: bool,
}

impl Features {
    fn degraded(count: usize, dimensions: usize) -> Self {
        Self {
            vectors: vec![FeatureVector::zeros(dimensions); count],
            degraded: true,
        }
    }
}

/// Converts normalised titles into [`FeatureVector`]s.
#[derive(Clone)]
pub struct FeatureExtractor {
    backend: Option<Arc<dyn EmbeddingBackend>>,
    dimensions: usize,
}

impl FeatureExtractor {
    /// Extract through `backend`, degrading to `dimensions`-long zero vectors.
    pub fn new(backend: Arc<dyn EmbeddingBackend>, dimensions: usize) -> Self {
        Self {
            backend: Some(backend),
            dimensions,
        }
    }

    /// An extractor with no backend; every request is degraded.
    pub fn disabled(dimensions: usize) -> Self {
        Self {
            backend: None,
            dimensions,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Embed `titles` in one batched backend call.
    ///
    /// Blank titles are not sent; they receive zero vectors. Any backend
    /// failure or malformed response degrades the whole request.
    pub async fn extract(&self, titles: &[String]) -> Features {
        let Some(backend) = self.backend.as_ref() else {
            tracing::warn!(count = titles.len(), "no embedding backend, features degraded");
            return Features::degraded(titles.len(), self.dimensions);
        };

        let (indices, batch): (Vec<usize>, Vec<String>) = titles
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.trim().is_empty())
            .map(|(i, t)| (i, t.clone()))
            .unzip();

        if batch.is_empty() {
            return Features {
                vectors: vec![FeatureVector::zeros(self.dimensions); titles.len()],
                degraded: false,
            };
        }

        let embedded = match backend.embed(&batch).await {
            Ok(vectors) => vectors,
            Err(err) => {
                tracing::warn!(backend = backend.name(), error = %err, "embedding failed, features degraded");
                return Features::degraded(titles.len(), self.dimensions);
            }
        };

        let dimensions = match validate_embeddings(&embedded, batch.len()) {
            Ok(dimensions) => dimensions,
            Err(reason) => {
                tracing::warn!(backend = backend.name(), %reason, "malformed embeddings, features degraded");
                return Features::degraded(titles.len(), self.dimensions);
            }
        };

        tracing::debug!(
            backend = backend.name(),
            count = embedded.len(),
            dimensions,
            "titles embedded"
        );

        let mut vectors = vec![FeatureVector::zeros(dimensions); titles.len()];
        for (index, values) in indices.into_iter().zip(embedded) {
            vectors[index] = FeatureVector::new(values);
        }
        Features {
            vectors,
            degraded: false,
        }
    }
}

impl std::fmt::Debug for FeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureExtractor")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_owned()))
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

/// Check count, shared non-zero length, and finiteness; returns the length.
fn validate_embeddings(vectors: &[Vec<f32>], expected: usize) -> Result<usize, String> {
    if vectors.len() != expected {
        return Err(format!("expected {expected} vectors, got {}", vectors.len()));
    }
    let dimensions = vectors.first().map_or(0, Vec::len);
    if dimensions == 0 {
        return Err("empty embedding vector".into());
    }
    if vectors.iter().any(|v| v.len() != dimensions) {
        return Err("embedding vectors have inconsistent lengths".into());
    }
    if vectors.iter().flatten().any(|v| !v.is_finite()) {
        return Err("embedding contains non-finite values".into());
    }
    Ok(dimensions)
}
