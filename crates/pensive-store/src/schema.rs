//! Database schema definitions.

/// Main schema SQL for initializing the database.
pub const SCHEMA: &str = r#"
-- Documents table
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    collection TEXT NOT NULL,
    fields TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);

-- Embeddings table; embedding is a raw little-endian f32 array
CREATE TABLE IF NOT EXISTS embeddings (
    id TEXT PRIMARY KEY,
    collection TEXT NOT NULL,
    embedding BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_embeddings_collection ON embeddings(collection);

-- Metadata table, reserved for versioning
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Schema version for migrations.
pub const SCHEMA_VERSION: u32 = 1;
