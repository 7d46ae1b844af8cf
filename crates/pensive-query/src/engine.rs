//! Hybrid query engine.
//!
//! Merges structured filter results with ranked semantic results. The
//! vector index is global across collections, so semantic hits are
//! membership-checked against the target collection after ranking; an
//! over-fetch factor absorbs hits discarded by that intersection.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;
use ulid::Ulid;

use pensive_core::{Embedder, Fields, Result, VectorIndex};
use pensive_store::SqliteEngine;

use crate::filter::{matches_all, Filter};

/// Over-fetch multiplier for semantic search. The index ranks globally
/// and collection/filter intersection happens afterwards, so fetching
/// extra keeps sparse collections from under-filling `top_k`. This is a
/// mitigation, not a guarantee.
const OVERFETCH_FACTOR: usize = 2;

/// A query against one collection.
///
/// At least one retrieval mode (filters or a semantic query) must be
/// present; a request with neither returns an empty result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Collection to query.
    pub collection: String,

    /// Structured filters, AND-combined.
    #[serde(default)]
    pub filters: Vec<Filter>,

    /// Semantic query text.
    #[serde(default)]
    pub semantic_query: Option<String>,

    /// Maximum ranked results. Ignored for filter-only queries.
    pub top_k: usize,
}

/// A single query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryHit {
    /// Matched document id.
    pub id: Ulid,

    /// Cosine similarity score. `None` for filter-only (unranked) hits.
    pub score: Option<f32>,

    /// The document's fields.
    pub fields: Fields,
}

/// Hybrid query engine over a store, an index, and an embedder.
///
/// Borrowed per query by the facade; holds no state of its own.
pub struct QueryEngine<'a> {
    store: &'a SqliteEngine,
    index: &'a dyn VectorIndex,
    embedder: &'a dyn Embedder,
}

impl<'a> QueryEngine<'a> {
    /// Create a query engine over the given components.
    pub fn new(
        store: &'a SqliteEngine,
        index: &'a dyn VectorIndex,
        embedder: &'a dyn Embedder,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
        }
    }

    /// Evaluate a hybrid query.
    ///
    /// Filters run first and short-circuit on an empty match set without
    /// touching the embedder. With a semantic query, index results are
    /// intersected with the collection and any filter candidates, in
    /// index score order. Filter-only queries return the full match set
    /// unranked, in storage scan order.
    pub fn query(&self, request: &QueryRequest) -> Result<Vec<QueryHit>> {
        let mut candidates: Option<Vec<(Ulid, Fields)>> = None;

        if !request.filters.is_empty() {
            let docs = self.store.scan_collection(&request.collection)?;
            let kept: Vec<(Ulid, Fields)> = docs
                .into_iter()
                .filter(|d| matches_all(&request.filters, &d.fields))
                .map(|d| (d.id, d.fields))
                .collect();

            debug!(
                "Filters matched {} documents in '{}'",
                kept.len(),
                request.collection
            );

            if kept.is_empty() {
                // Short-circuit: no semantic ranking, embedder untouched.
                return Ok(Vec::new());
            }
            candidates = Some(kept);
        }

        let Some(query_text) = request.semantic_query.as_deref() else {
            // Filter-only: unranked, storage scan order, top_k ignored.
            // No filters either means no retrieval mode was specified.
            return Ok(candidates
                .map(|kept| {
                    kept.into_iter()
                        .map(|(id, fields)| QueryHit {
                            id,
                            score: None,
                            fields,
                        })
                        .collect()
                })
                .unwrap_or_default());
        };

        let query_vector = self.embedder.embed(query_text)?;
        let ranked = self
            .index
            .search(&query_vector, request.top_k * OVERFETCH_FACTOR);

        debug!("Semantic search returned {} candidates", ranked.len());

        let candidate_ids: Option<HashSet<Ulid>> = candidates
            .as_ref()
            .map(|kept| kept.iter().map(|(id, _)| *id).collect());

        let mut hits = Vec::new();
        for (id, score) in ranked {
            // The index is global across collections; membership is
            // checked after ranking.
            let Some(doc) = self.store.get_document(id)? else {
                continue;
            };
            if doc.collection != request.collection {
                continue;
            }
            if let Some(ids) = &candidate_ids {
                if !ids.contains(&id) {
                    continue;
                }
            }

            hits.push(QueryHit {
                id,
                score: Some(score),
                fields: doc.fields,
            });
            if hits.len() == request.top_k {
                break;
            }
        }

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterOp;
    use serde_json::json;

    use pensive_embed::HashEmbedder;
    use pensive_index::FlatIndex;

    /// Embedder stub that fails the test if ever invoked.
    struct PanicEmbedder;

    impl Embedder for PanicEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            panic!("embedder must not be called");
        }
    }

    fn fields(pairs: &[(&str, serde_json::Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn filter(field: &str, op: FilterOp) -> Filter {
        Filter {
            field: field.to_string(),
            op,
        }
    }

    /// Populate a store and index with one embedded document.
    fn seed(
        store: &mut SqliteEngine,
        index: &mut FlatIndex,
        embedder: &HashEmbedder,
        collection: &str,
        f: Fields,
    ) -> Ulid {
        let doc = store.insert_document(collection, f).unwrap();
        let vector = embedder.embed(&doc.embed_text()).unwrap();
        store
            .insert_embedding(doc.id, collection, &vector)
            .unwrap();
        index.add(doc.id, &vector);
        doc.id
    }

    #[test]
    fn test_no_retrieval_mode_returns_empty() {
        let store = SqliteEngine::open_memory(1).unwrap();
        let index = FlatIndex::new();
        let engine = QueryEngine::new(&store, &index, &PanicEmbedder);

        let hits = engine
            .query(&QueryRequest {
                collection: "notes".into(),
                filters: vec![],
                semantic_query: None,
                top_k: 5,
            })
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_filter_only_returns_unranked_set() {
        let mut store = SqliteEngine::open_memory(1).unwrap();
        let mut index = FlatIndex::new();
        let embedder = HashEmbedder::with_dimension(64);

        let a = seed(
            &mut store,
            &mut index,
            &embedder,
            "notes",
            fields(&[("status", json!("open")), ("content", json!("first"))]),
        );
        seed(
            &mut store,
            &mut index,
            &embedder,
            "notes",
            fields(&[("status", json!("closed")), ("content", json!("second"))]),
        );
        let c = seed(
            &mut store,
            &mut index,
            &embedder,
            "notes",
            fields(&[("status", json!("open")), ("content", json!("third"))]),
        );

        let hits = engine_query(
            &store,
            &index,
            &PanicEmbedder,
            &QueryRequest {
                collection: "notes".into(),
                filters: vec![filter("status", FilterOp::Eq(json!("open")))],
                semantic_query: None,
                // top_k is ignored for filter-only queries
                top_k: 1,
            },
        );

        let ids: Vec<_> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![a, c]);
        assert!(hits.iter().all(|h| h.score.is_none()));
    }

    #[test]
    fn test_empty_filter_set_short_circuits() {
        let mut store = SqliteEngine::open_memory(1).unwrap();
        let mut index = FlatIndex::new();
        let embedder = HashEmbedder::with_dimension(64);

        seed(
            &mut store,
            &mut index,
            &embedder,
            "notes",
            fields(&[("status", json!("open"))]),
        );

        // PanicEmbedder proves semantic ranking is never attempted.
        let hits = engine_query(
            &store,
            &index,
            &PanicEmbedder,
            &QueryRequest {
                collection: "notes".into(),
                filters: vec![filter("status", FilterOp::Eq(json!("no-such")))],
                semantic_query: Some("anything".into()),
                top_k: 5,
            },
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn test_semantic_query_ranks_by_similarity() {
        let mut store = SqliteEngine::open_memory(1).unwrap();
        let mut index = FlatIndex::new();
        let embedder = HashEmbedder::with_dimension(64);

        let close = seed(
            &mut store,
            &mut index,
            &embedder,
            "notes",
            fields(&[("content", json!("rust database engine internals"))]),
        );
        seed(
            &mut store,
            &mut index,
            &embedder,
            "notes",
            fields(&[("content", json!("gardening tips for spring"))]),
        );

        let hits = engine_query(
            &store,
            &index,
            &embedder,
            &QueryRequest {
                collection: "notes".into(),
                filters: vec![],
                semantic_query: Some("rust database".into()),
                top_k: 2,
            },
        );

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, close);
        assert!(hits[0].score.unwrap() > hits[1].score.unwrap());
    }

    #[test]
    fn test_semantic_query_scoped_to_collection() {
        let mut store = SqliteEngine::open_memory(1).unwrap();
        let mut index = FlatIndex::new();
        let embedder = HashEmbedder::with_dimension(64);

        // Identical content in both collections: the global index ranks
        // them together, but a scoped query must never cross over.
        let in_a = seed(
            &mut store,
            &mut index,
            &embedder,
            "a",
            fields(&[("content", json!("shared topic text"))]),
        );
        seed(
            &mut store,
            &mut index,
            &embedder,
            "b",
            fields(&[("content", json!("shared topic text"))]),
        );

        let hits = engine_query(
            &store,
            &index,
            &embedder,
            &QueryRequest {
                collection: "a".into(),
                filters: vec![],
                semantic_query: Some("shared topic".into()),
                top_k: 10,
            },
        );

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, in_a);
    }

    #[test]
    fn test_hybrid_intersects_filters_and_ranking() {
        let mut store = SqliteEngine::open_memory(1).unwrap();
        let mut index = FlatIndex::new();
        let embedder = HashEmbedder::with_dimension(64);

        let open = seed(
            &mut store,
            &mut index,
            &embedder,
            "notes",
            fields(&[
                ("status", json!("open")),
                ("content", json!("rust database notes")),
            ]),
        );
        seed(
            &mut store,
            &mut index,
            &embedder,
            "notes",
            fields(&[
                ("status", json!("closed")),
                ("content", json!("rust database notes")),
            ]),
        );

        let hits = engine_query(
            &store,
            &index,
            &embedder,
            &QueryRequest {
                collection: "notes".into(),
                filters: vec![filter("status", FilterOp::Eq(json!("open")))],
                semantic_query: Some("rust database".into()),
                top_k: 10,
            },
        );

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, open);
        assert!(hits[0].score.is_some());
    }

    #[test]
    fn test_top_k_truncation() {
        let mut store = SqliteEngine::open_memory(1).unwrap();
        let mut index = FlatIndex::new();
        let embedder = HashEmbedder::with_dimension(64);

        for i in 0..5 {
            seed(
                &mut store,
                &mut index,
                &embedder,
                "notes",
                fields(&[("content", json!(format!("note number {i} about rust")))]),
            );
        }

        let hits = engine_query(
            &store,
            &index,
            &embedder,
            &QueryRequest {
                collection: "notes".into(),
                filters: vec![],
                semantic_query: Some("rust".into()),
                top_k: 3,
            },
        );
        assert_eq!(hits.len(), 3);
    }

    fn engine_query(
        store: &SqliteEngine,
        index: &FlatIndex,
        embedder: &dyn Embedder,
        request: &QueryRequest,
    ) -> Vec<QueryHit> {
        QueryEngine::new(store, index, embedder)
            .query(request)
            .unwrap()
    }
}
