//! Core traits defining the interfaces between components.

use ulid::Ulid;

use crate::error::Result;

/// Embedding model trait.
///
/// Implementations must return vectors of a stable dimension for the
/// lifetime of a store session; the facade probes the dimension once at
/// open and treats it as fixed thereafter.
pub trait Embedder {
    /// Embed a single text into a fixed-dimension vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Vector index trait.
///
/// All implementations share normalization semantics: vectors are stored
/// at unit L2 norm and zero-magnitude vectors are silently excluded. An
/// accelerated backend is substitutable behind this contract.
pub trait VectorIndex {
    /// Add a vector under `id`. Zero-norm vectors are a silent no-op.
    ///
    /// Duplicate ids are not checked; callers remove before re-adding.
    fn add(&mut self, id: Ulid, vector: &[f32]);

    /// Replace the vector for `id`. Equivalent to `remove` then `add`.
    fn update(&mut self, id: Ulid, vector: &[f32]);

    /// Drop the entry for `id` if present; no-op otherwise.
    fn remove(&mut self, id: Ulid);

    /// Reset the index and repopulate from persisted `(id, blob)` rows,
    /// where each blob is a little-endian f32 array. Zero-norm vectors
    /// are skipped. This is the index's only recovery mechanism.
    fn build_from_storage(&mut self, rows: &[(Ulid, Vec<u8>)]);

    /// Return the `top_k` entries most similar to `query` by cosine
    /// similarity, in descending score order. Ties resolve in insertion
    /// order. A zero-norm query yields an empty result.
    fn search(&self, query: &[f32], top_k: usize) -> Vec<(Ulid, f32)>;

    /// Number of indexed entries.
    fn len(&self) -> usize;

    /// Whether the index holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
