//! Exact brute-force cosine-similarity index.

use tracing::debug;
use ulid::Ulid;

use pensive_core::{vector_from_bytes, VectorIndex};

use crate::norm::{dot, l2_normalize};

/// One indexed entry: a document id and its unit-norm vector.
#[derive(Debug, Clone)]
struct IndexEntry {
    id: Ulid,
    vector: Vec<f32>,
}

/// Exact linear-scan index over normalized vectors.
///
/// Holds no durable state of its own; it is rebuilt wholesale from the
/// storage engine's persisted embeddings on open. Removal rebuilds the
/// entry list without the target id, an O(n) cost accepted for
/// small-to-moderate scale. A production-scale backend should tombstone
/// instead.
#[derive(Debug, Default)]
pub struct FlatIndex {
    entries: Vec<IndexEntry>,
}

impl FlatIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorIndex for FlatIndex {
    fn add(&mut self, id: Ulid, vector: &[f32]) {
        let Some(vector) = l2_normalize(vector) else {
            debug!("Skipping zero-norm vector for {}", id);
            return;
        };
        self.entries.push(IndexEntry { id, vector });
    }

    fn update(&mut self, id: Ulid, vector: &[f32]) {
        self.remove(id);
        self.add(id, vector);
    }

    fn remove(&mut self, id: Ulid) {
        self.entries.retain(|e| e.id != id);
    }

    fn build_from_storage(&mut self, rows: &[(Ulid, Vec<u8>)]) {
        self.entries.clear();
        for (id, blob) in rows {
            self.add(*id, &vector_from_bytes(blob));
        }
        debug!("Rebuilt index with {} entries", self.entries.len());
    }

    fn search(&self, query: &[f32], top_k: usize) -> Vec<(Ulid, f32)> {
        if self.entries.is_empty() {
            return Vec::new();
        }
        let Some(query) = l2_normalize(query) else {
            return Vec::new();
        };

        let mut scored: Vec<(Ulid, f32)> = self
            .entries
            .iter()
            .map(|e| (e.id, dot(&e.vector, &query)))
            .collect();

        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
