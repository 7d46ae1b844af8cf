//! pensive-db - Database facade
//!
//! Wires the storage engine, vector index, and embedder together and
//! exposes the public CRUD + query surface. The facade owns
//! orchestration: a document is never visible in the index without also
//! being durably persisted, and vice versa for removal.

use std::path::Path;

use tracing::{debug, info};
use ulid::Ulid;

use pensive_core::fields_to_text;
use pensive_embed::HashEmbedder;
use pensive_index::FlatIndex;
use pensive_query::QueryEngine;
use pensive_store::SqliteEngine;

pub use pensive_core::{
    Document, Embedder, Fields, IndexMode, PensiveError, Result, StoreStats, VectorIndex,
};
pub use pensive_query::{Filter, FilterOp, QueryHit, QueryRequest};

/// Options for opening a store.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Commit threshold for the storage engine's pending-write counter.
    pub flush_every: u32,

    /// Vector index backend.
    pub index_mode: IndexMode,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            flush_every: 1,
            index_mode: IndexMode::Flat,
        }
    }
}

/// An open PensiveDB handle.
///
/// Owns all mutable state (pending-write counter, in-memory index);
/// nothing is shared between instances. Single-threaded synchronous
/// execution: every operation runs to completion before the next.
pub struct Pensive {
    store: SqliteEngine,
    index: Box<dyn VectorIndex>,
    embedder: Box<dyn Embedder>,
    dimension: usize,
}

impl Pensive {
    /// Open or create a store with the default hashing embedder.
    pub fn open(path: impl AsRef<Path>, options: OpenOptions) -> Result<Self> {
        Self::open_with_embedder(path, options, Box::new(HashEmbedder::new()))
    }

    /// Open or create a store with a custom embedding backend.
    pub fn open_with_embedder(
        path: impl AsRef<Path>,
        options: OpenOptions,
        embedder: Box<dyn Embedder>,
    ) -> Result<Self> {
        let store = SqliteEngine::open(path, options.flush_every)?;
        Self::init(store, options.index_mode, embedder)
    }

    /// Open an in-memory store (for testing).
    pub fn open_memory(options: OpenOptions, embedder: Box<dyn Embedder>) -> Result<Self> {
        let store = SqliteEngine::open_memory(options.flush_every)?;
        Self::init(store, options.index_mode, embedder)
    }

    fn init(
        store: SqliteEngine,
        index_mode: IndexMode,
        embedder: Box<dyn Embedder>,
    ) -> Result<Self> {
        // Fix the session dimension with a single probe.
        let dimension = embedder.embed("dimension probe")?.len();

        let mut index: Box<dyn VectorIndex> = match index_mode {
            IndexMode::Flat => Box::new(FlatIndex::new()),
        };

        // Warm-start from persisted embeddings; the index holds no
        // durable state of its own.
        let rows = store.all_embeddings()?;
        index.build_from_storage(&rows);

        info!(
            "Opened store: dimension={}, index={} with {} entries",
            dimension,
            index_mode,
            index.len()
        );

        Ok(Self {
            store,
            index,
            embedder,
            dimension,
        })
    }

    /// The embedding dimension fixed for this session.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Insert a document, persisting it and its embedding, then adding
    /// the vector to the index. Returns the new document's id.
    pub fn insert(&mut self, collection: &str, fields: Fields) -> Result<Ulid> {
        let doc = self.store.insert_document(collection, fields)?;

        let vector = self.embedder.embed(&doc.embed_text())?;
        self.store.insert_embedding(doc.id, &doc.collection, &vector)?;
        self.index.add(doc.id, &vector);

        debug!("Inserted {} into '{}'", doc.id, doc.collection);
        Ok(doc.id)
    }

    /// Fetch a document by id.
    pub fn get(&self, id: Ulid) -> Result<Option<Document>> {
        self.store.get_document(id)
    }

    /// Merge `updates` into a document and re-embed the entire merged
    /// field set. Unknown ids return `None` without touching the
    /// embedder or the index.
    pub fn update(&mut self, id: Ulid, updates: Fields) -> Result<Option<Fields>> {
        let Some(merged) = self.store.update_document(id, updates)? else {
            return Ok(None);
        };

        let vector = self.embedder.embed(&fields_to_text(&merged))?;
        self.store.update_embedding(id, &vector)?;
        self.index.update(id, &vector);

        debug!("Updated {}", id);
        Ok(Some(merged))
    }

    /// Delete a document and its embedding. Idempotent.
    pub fn delete(&mut self, id: Ulid) -> Result<()> {
        self.store.delete_document(id)?;
        self.index.remove(id);

        debug!("Deleted {}", id);
        Ok(())
    }

    /// Evaluate a hybrid query.
    pub fn query(&self, request: &QueryRequest) -> Result<Vec<QueryHit>> {
        QueryEngine::new(&self.store, self.index.as_ref(), self.embedder.as_ref())
            .query(request)
    }

    /// Commit any pending writes immediately.
    pub fn flush(&mut self) -> Result<()> {
        self.store.flush()
    }

    /// Store statistics.
    pub fn stats(&self) -> Result<StoreStats> {
        self.store.stats()
    }

    /// Number of entries currently in the vector index.
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Flush pending writes and release resources.
    pub fn close(self) -> Result<()> {
        let Self { store, .. } = self;
        store.close()
    }
}
