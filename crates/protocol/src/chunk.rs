use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form chunk metadata. Well-known keys (`document_id`, `source`,
/// `page`, `offset`, `section`, `node_id`) are read through the typed
/// accessors on [`Chunk`]; everything else is carried opaquely.
pub type Metadata = serde_json::Map<String, Value>;

/// A unit of retrievable content.
///
/// Chunks are produced by an external loading/chunking pipeline, inserted
/// once into an index and immutable thereafter. Indexes copy chunks in;
/// callers never get an alias back to their own data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    /// Dense embedding, when the ingestion pipeline produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::new(),
            embedding: None,
        }
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Builder-style single metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// String metadata value for `key`, if present and a string.
    #[must_use]
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Unsigned integer metadata value for `key`.
    #[must_use]
    pub fn meta_u64(&self, key: &str) -> Option<u64> {
        self.metadata.get(key).and_then(Value::as_u64)
    }

    /// First string value found among `keys`, in priority order.
    #[must_use]
    pub fn first_meta_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.meta_str(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn metadata_accessors() {
        let chunk = Chunk::new("c1", "body")
            .with_meta("source", "guide.md")
            .with_meta("page", 7);

        assert_eq!(chunk.meta_str("source"), Some("guide.md"));
        assert_eq!(chunk.meta_u64("page"), Some(7));
        assert_eq!(chunk.meta_str("missing"), None);
        assert_eq!(
            chunk.first_meta_str(&["title", "source"]),
            Some("guide.md")
        );
    }

    #[test]
    fn serde_round_trip_skips_absent_embedding() {
        let chunk = Chunk::new("c1", "body");
        let json = serde_json::to_string(&chunk).unwrap();
        assert!(!json.contains("embedding"));

        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);
    }
}
