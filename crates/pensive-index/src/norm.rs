//! Vector normalization utilities.
//!
//! Kept as pure free functions so every index backend shares identical
//! normalization semantics: unit L2 norm, zero-vector exclusion.

/// L2-normalize a vector. Returns `None` for a zero-magnitude input,
/// which callers must treat as "not indexable" rather than an error.
pub fn l2_normalize(vector: &[f32]) -> Option<Vec<f32>> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return None;
    }
    Some(vector.iter().map(|x| x / norm).collect())
}

/// Dot product of two equal-length vectors. For unit-norm inputs this is
/// the cosine similarity, in [-1, 1].
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
