//! Deterministic hashing embedder.

use pensive_core::{Embedder, Result};

/// Default embedding dimension, matching common sentence-embedding
/// models so stores remain portable to a model-backed embedder.
const DEFAULT_DIMENSION: usize = 384;

/// Bag-of-words feature-hashing embedder.
///
/// Each lowercased token is hashed into one of `dimension` buckets and
/// counted. Texts sharing tokens land in shared buckets, so cosine
/// similarity over these vectors tracks lexical overlap. Fully
/// deterministic: the same text always maps to the same vector, and the
/// dimension is stable across calls.
///
/// Embedding an empty or tokenless text yields the zero vector, which
/// the index silently excludes.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create an embedder with the default dimension.
    pub fn new() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
        }
    }

    /// Create an embedder with a custom dimension.
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    /// FNV-1a hash of a token.
    fn hash_token(token: &str) -> u64 {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in token.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let bucket = (Self::hash_token(&token) % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }

        Ok(vector)
    }
}
