//! Vector blob encoding.
//!
//! Embeddings are persisted as raw little-endian f32 arrays. Both the
//! storage engine and the index decode through these helpers so the wire
//! format is defined in exactly one place.

/// Convert an f32 vector to little-endian bytes.
pub fn vector_to_bytes(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a little-endian f32 blob. Trailing bytes that do not form a
/// whole f32 are ignored.
pub fn vector_from_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
