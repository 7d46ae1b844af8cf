//! Core domain types for PensiveDB.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

/// Document field map. Insertion order is preserved so that round-trips
/// through storage return fields in the order they were written.
pub type Fields = serde_json::Map<String, Value>;

/// A document in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier (ULID). Ids share a single global space across
    /// all collections.
    pub id: Ulid,

    /// Collection this document belongs to.
    pub collection: String,

    /// User-provided fields.
    pub fields: Fields,

    /// Creation timestamp (RFC 3339, UTC).
    pub created_at: String,

    /// Last update timestamp (RFC 3339, UTC).
    pub updated_at: String,
}

impl Document {
    /// Create a new document with a fresh id and current timestamps.
    pub fn new(collection: &str, fields: Fields) -> Self {
        let now = now_rfc3339();
        Self {
            id: Ulid::new(),
            collection: collection.to_string(),
            fields,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Render all field values as a single space-joined string.
    ///
    /// This is the text handed to the embedder, built from the entire
    /// field set so that updates re-embed the full document.
    pub fn embed_text(&self) -> String {
        fields_to_text(&self.fields)
    }
}

/// A persisted embedding row. Exactly one exists per document once an
/// insert completes; the pair is deleted together.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    /// Same id as the owning document.
    pub id: Ulid,

    /// Collection tag, duplicated from the document for filtering.
    pub collection: String,

    /// Raw (unnormalized) vector of the fixed session dimension.
    pub vector: Vec<f32>,
}

/// Statistics about a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of documents.
    pub documents: u64,

    /// Number of embedding rows.
    pub embeddings: u64,

    /// Database size in bytes (page count * page size).
    pub storage_bytes: u64,
}

/// Current UTC time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Render a field map as the text to embed: the string form of every
/// value, space-joined, in field order.
pub fn fields_to_text(fields: &Fields) -> String {
    fields
        .values()
        .map(value_to_text)
        .collect::<Vec<_>>()
        .join(" ")
}

/// String rendering of a JSON value. Strings render bare (no quotes);
/// everything else uses its JSON form.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_document_new() {
        let doc = Document::new("notes", fields(&[("title", json!("hello"))]));
        assert_eq!(doc.collection, "notes");
        assert_eq!(doc.created_at, doc.updated_at);
        assert_eq!(doc.fields["title"], json!("hello"));
    }

    #[test]
    fn test_embed_text_joins_all_values() {
        let doc = Document::new(
            "notes",
            fields(&[("title", json!("hello world")), ("pages", json!(42))]),
        );
        assert_eq!(doc.embed_text(), "hello world 42");
    }

    #[test]
    fn test_value_to_text_strings_are_bare() {
        assert_eq!(value_to_text(&json!("abc")), "abc");
        assert_eq!(value_to_text(&json!(1.5)), "1.5");
        assert_eq!(value_to_text(&json!(true)), "true");
    }

    #[test]
    fn test_fields_preserve_order() {
        let f = fields(&[("z", json!(1)), ("a", json!(2)), ("m", json!(3))]);
        let keys: Vec<_> = f.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
