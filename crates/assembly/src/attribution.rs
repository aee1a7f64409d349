//! Source attributions for the final context, built as a pure function of
//! the ordered kept chunks.

use ragkit_protocol::Chunk;
use serde::{Deserialize, Serialize};

/// Metadata field aliases tried in order when resolving a human-readable
/// source label.
pub const SOURCE_ALIASES: &[&str] = &[
    "source",
    "file_path",
    "filename",
    "document_name",
    "title",
    "url",
];

/// Where the chunk sits within its source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Page(u64),
    Offset(u64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttribution {
    /// 1-based position in the assembled context.
    pub index: usize,
    pub chunk_id: String,
    pub document_id: Option<String>,
    pub source: Option<String>,
    /// Page number when known, character offset otherwise.
    pub location: Option<Location>,
    pub score: f32,
    pub section: Option<String>,
}

pub(crate) fn attribute(index: usize, chunk: &Chunk, score: f32) -> SourceAttribution {
    let location = chunk
        .meta_u64("page")
        .map(Location::Page)
        .or_else(|| chunk.meta_u64("offset").map(Location::Offset));

    SourceAttribution {
        index,
        chunk_id: chunk.id.clone(),
        document_id: chunk.meta_str("document_id").map(str::to_owned),
        source: chunk.first_meta_str(SOURCE_ALIASES).map(str::to_owned),
        location,
        score,
        section: chunk.meta_str("section").map(str::to_owned),
    }
}
