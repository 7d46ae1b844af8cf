//! SQLite-based storage engine.

use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info};
use ulid::Ulid;

use pensive_core::{
    now_rfc3339, vector_from_bytes, vector_to_bytes, Document, Fields, PensiveError, Result,
    StoreStats,
};

use crate::schema::{SCHEMA, SCHEMA_VERSION};

/// SQLite-based storage engine with batched commits.
///
/// Writes accumulate inside an explicit transaction until `flush_every`
/// logical writes have been recorded, then commit. `flush_every == 1`
/// commits every write. The engine assumes a single owning thread for
/// the lifetime of the handle; writes take `&mut self`, reads `&self`.
pub struct SqliteEngine {
    conn: Connection,

    /// Commit threshold for the pending-write counter.
    flush_every: u32,

    /// Logical writes recorded since the last commit.
    pending: u32,
}

impl SqliteEngine {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>, flush_every: u32) -> Result<Self> {
        let path = path.as_ref();

        if flush_every == 0 {
            return Err(PensiveError::config("flush_every must be at least 1"));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| PensiveError::database(format!("Failed to open database: {e}")))?;

        Self::init(conn, flush_every, path)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory(flush_every: u32) -> Result<Self> {
        if flush_every == 0 {
            return Err(PensiveError::config("flush_every must be at least 1"));
        }

        let conn = Connection::open_in_memory()
            .map_err(|e| PensiveError::database(format!("Failed to open in-memory database: {e}")))?;

        Self::init(conn, flush_every, Path::new(":memory:"))
    }

    fn init(conn: Connection, flush_every: u32, path: &Path) -> Result<Self> {
        Self::configure_connection(&conn)?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| PensiveError::database(format!("Failed to initialize schema: {e}")))?;

        conn.execute(
            "INSERT OR IGNORE INTO metadata (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )
        .map_err(|e| PensiveError::database(e.to_string()))?;

        info!("Database opened at {:?}", path);

        Ok(Self {
            conn,
            flush_every,
            pending: 0,
        })
    }

    /// Configure the SQLite connection.
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 30000;
            PRAGMA temp_store = MEMORY;
            "#,
        )
        .map_err(|e| PensiveError::database(format!("Failed to configure connection: {e}")))?;

        Ok(())
    }

    /// Open the pending transaction if no writes are buffered yet.
    fn begin_if_needed(&mut self) -> Result<()> {
        if self.pending == 0 {
            self.conn
                .execute_batch("BEGIN IMMEDIATE")
                .map_err(|e| PensiveError::database(e.to_string()))?;
        }
        Ok(())
    }

    /// Record one logical write, committing once the threshold is hit.
    fn note_write(&mut self) -> Result<()> {
        self.pending += 1;
        if self.pending >= self.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    /// Commit any pending writes immediately.
    pub fn flush(&mut self) -> Result<()> {
        if self.pending > 0 {
            self.conn
                .execute_batch("COMMIT")
                .map_err(|e| PensiveError::database(e.to_string()))?;
            debug!("Committed {} pending writes", self.pending);
            self.pending = 0;
        }
        Ok(())
    }

    /// Number of writes buffered in the pending transaction.
    pub fn pending_writes(&self) -> u32 {
        self.pending
    }

    /// Flush pending writes and release the connection.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }

    // Document operations

    /// Insert a new document, assigning a fresh id and timestamps.
    pub fn insert_document(&mut self, collection: &str, fields: Fields) -> Result<Document> {
        let doc = Document::new(collection, fields);
        let fields_json = serde_json::to_string(&doc.fields)?;

        self.begin_if_needed()?;
        self.conn
            .execute(
                r#"
                INSERT INTO documents (id, collection, fields, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    doc.id.to_string(),
                    doc.collection,
                    fields_json,
                    doc.created_at,
                    doc.updated_at,
                ],
            )
            .map_err(|e| PensiveError::database(format!("Failed to insert document: {e}")))?;
        self.note_write()?;

        debug!("Inserted document: {}", doc.id);
        Ok(doc)
    }

    /// Fetch a document by id.
    pub fn get_document(&self, id: Ulid) -> Result<Option<Document>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, collection, fields, created_at, updated_at FROM documents WHERE id = ?1",
            )
            .map_err(|e| PensiveError::database(e.to_string()))?;

        let result = stmt
            .query_row(params![id.to_string()], Self::row_to_document)
            .optional()
            .map_err(|e| PensiveError::database(e.to_string()))?;

        Ok(result)
    }

    /// Merge `updates` into an existing document's fields, bump
    /// `updated_at`, and return the merged map. Returns `None` when the
    /// id is unknown; callers must not recompute a vector in that case.
    pub fn update_document(&mut self, id: Ulid, updates: Fields) -> Result<Option<Fields>> {
        let Some(doc) = self.get_document(id)? else {
            return Ok(None);
        };

        let mut merged = doc.fields;
        for (key, value) in updates {
            merged.insert(key, value);
        }

        let fields_json = serde_json::to_string(&merged)?;
        let now = now_rfc3339();

        self.begin_if_needed()?;
        self.conn
            .execute(
                "UPDATE documents SET fields = ?1, updated_at = ?2 WHERE id = ?3",
                params![fields_json, now, id.to_string()],
            )
            .map_err(|e| PensiveError::database(format!("Failed to update document: {e}")))?;
        self.note_write()?;

        debug!("Updated document: {}", id);
        Ok(Some(merged))
    }

    /// Delete a document and its embedding row. Idempotent: deleting an
    /// unknown id is a no-op.
    pub fn delete_document(&mut self, id: Ulid) -> Result<()> {
        self.begin_if_needed()?;
        self.conn
            .execute("DELETE FROM documents WHERE id = ?1", params![id.to_string()])
            .map_err(|e| PensiveError::database(e.to_string()))?;
        self.conn
            .execute("DELETE FROM embeddings WHERE id = ?1", params![id.to_string()])
            .map_err(|e| PensiveError::database(e.to_string()))?;
        self.note_write()?;

        debug!("Deleted document: {}", id);
        Ok(())
    }

    /// List all documents in a collection, in storage scan order.
    pub fn scan_collection(&self, collection: &str) -> Result<Vec<Document>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, collection, fields, created_at, updated_at FROM documents WHERE collection = ?1",
            )
            .map_err(|e| PensiveError::database(e.to_string()))?;

        let documents = stmt
            .query_map(params![collection], Self::row_to_document)
            .map_err(|e| PensiveError::database(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PensiveError::database(e.to_string()))?;

        Ok(documents)
    }

    // Embedding operations

    /// Persist the vector for a document as a raw little-endian f32 blob.
    /// The document row must already exist; sequencing is the facade's
    /// responsibility.
    pub fn insert_embedding(&mut self, id: Ulid, collection: &str, vector: &[f32]) -> Result<()> {
        let blob = vector_to_bytes(vector);

        self.begin_if_needed()?;
        self.conn
            .execute(
                "INSERT INTO embeddings (id, collection, embedding) VALUES (?1, ?2, ?3)",
                params![id.to_string(), collection, blob],
            )
            .map_err(|e| PensiveError::database(format!("Failed to insert embedding: {e}")))?;
        self.note_write()?;

        Ok(())
    }

    /// Overwrite the stored vector for an existing id.
    pub fn update_embedding(&mut self, id: Ulid, vector: &[f32]) -> Result<()> {
        let blob = vector_to_bytes(vector);

        self.begin_if_needed()?;
        self.conn
            .execute(
                "UPDATE embeddings SET embedding = ?1 WHERE id = ?2",
                params![blob, id.to_string()],
            )
            .map_err(|e| PensiveError::database(format!("Failed to update embedding: {e}")))?;
        self.note_write()?;

        Ok(())
    }

    /// Fetch the stored vector for a document.
    pub fn get_embedding(&self, id: Ulid) -> Result<Option<Vec<f32>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT embedding FROM embeddings WHERE id = ?1")
            .map_err(|e| PensiveError::database(e.to_string()))?;

        let blob: Option<Vec<u8>> = stmt
            .query_row(params![id.to_string()], |row| row.get(0))
            .optional()
            .map_err(|e| PensiveError::database(e.to_string()))?;

        Ok(blob.map(|b| vector_from_bytes(&b)))
    }

    /// Fetch every persisted embedding as `(id, blob)` pairs. Used to
    /// warm-start the vector index on open.
    pub fn all_embeddings(&self) -> Result<Vec<(Ulid, Vec<u8>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, embedding FROM embeddings")
            .map_err(|e| PensiveError::database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                let id_str: String = row.get(0)?;
                let blob: Vec<u8> = row.get(1)?;
                Ok((
                    Ulid::from_string(&id_str).unwrap_or_else(|_| Ulid::nil()),
                    blob,
                ))
            })
            .map_err(|e| PensiveError::database(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PensiveError::database(e.to_string()))?;

        Ok(rows)
    }

    // Stats

    /// Count documents and embeddings and estimate on-disk size.
    pub fn stats(&self) -> Result<StoreStats> {
        let documents: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(|e| PensiveError::database(e.to_string()))?;

        let embeddings: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))
            .map_err(|e| PensiveError::database(e.to_string()))?;

        let page_count: u64 = self
            .conn
            .query_row("PRAGMA page_count", [], |row| row.get(0))
            .unwrap_or(0);
        let page_size: u64 = self
            .conn
            .query_row("PRAGMA page_size", [], |row| row.get(0))
            .unwrap_or(4096);

        Ok(StoreStats {
            documents,
            embeddings,
            storage_bytes: page_count * page_size,
        })
    }

    /// Convert a row to a Document.
    fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
        let id_str: String = row.get(0)?;
        let fields_str: String = row.get(2)?;

        Ok(Document {
            id: Ulid::from_string(&id_str).unwrap_or_else(|_| Ulid::nil()),
            collection: row.get(1)?,
            fields: serde_json::from_str(&fields_str).unwrap_or_default(),
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

impl Drop for SqliteEngine {
    fn drop(&mut self) {
        // Best-effort commit of anything still buffered.
        let _ = self.flush();
    }
}
