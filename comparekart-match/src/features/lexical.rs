//! Offline lexical embedding backend.
//!
//! Hashes word unigrams and adjacent-word bigrams into a fixed number of
//! buckets and L2-normalises the counts. Titles sharing most of their words
//! land close together, which is enough to match the same product listed by
//! different sources when no remote embedding service is configured.

use async_trait::async_trait;

use super::EmbeddingBackend;
use crate::error::CompareError;

/// Default bucket count.
pub const DEFAULT_LEXICAL_DIMENSIONS: usize = 512;

/// Feature-hashing embedder over word unigrams and bigrams.
#[derive(Debug, Clone)]
pub struct LexicalEmbedder {
    dimensions: usize,
}

impl Default for LexicalEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_LEXICAL_DIMENSIONS)
    }
}

impl LexicalEmbedder {
    /// Create an embedder with `dimensions` buckets (at least one).
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed one text synchronously.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        let words: Vec<&str> = text.split_whitespace().collect();

        for word in &words {
            self.add_token(&mut vector, word.as_bytes(), 1.0);
        }
        for pair in words.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.add_token(&mut vector, bigram.as_bytes(), 0.5);
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    fn add_token(&self, vector: &mut [f32], token: &[u8], weight: f32) {
        let hash = fnv1a(token);
        let bucket = (hash % self.dimensions as u64) as usize;
        vector[bucket] += weight;
    }
}

#[async_trait]
impl EmbeddingBackend for LexicalEmbedder {
    fn name(&self) -> &str {
        "lexical"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CompareError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// 64-bit FNV-1a; stable across platforms and releases.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}
