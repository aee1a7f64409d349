//! Output formatters. The assembler owns the pipeline; a formatter only
//! decides how kept chunks become text and how many non-content
//! characters that costs per chunk.

use crate::attribution::SOURCE_ALIASES;
use ragkit_protocol::Chunk;
use std::sync::Arc;

/// A chunk that survived the pipeline, ready to be rendered.
#[derive(Debug, Clone)]
pub struct ContextEntry {
    /// 1-based position in the final context.
    pub index: usize,
    pub chunk: Arc<Chunk>,
    /// Content after any budget truncation.
    pub content: String,
    pub score: f32,
}

/// Renders kept chunks into the final context body.
///
/// `overhead_chars` must account for every non-content character the
/// format adds for one chunk (wrappers, separators, per-chunk footer
/// lines) so the token budget can price a chunk before formatting runs.
pub trait ContextFormatter: Send + Sync {
    fn name(&self) -> &str;

    fn overhead_chars(&self, chunk: &Chunk, index: usize) -> usize;

    fn format(
        &self,
        entries: &[ContextEntry],
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// `<source>`-tagged blocks, one per chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggedFormatter;

impl TaggedFormatter {
    fn render(index: usize, chunk: &Chunk, content: &str) -> String {
        format!(
            "<source id=\"{index}\" ref=\"{}\">\n{content}\n</source>",
            chunk.id
        )
    }
}

impl ContextFormatter for TaggedFormatter {
    fn name(&self) -> &str {
        "tagged"
    }

    fn overhead_chars(&self, chunk: &Chunk, index: usize) -> usize {
        // Wrapper plus the blank-line joiner.
        Self::render(index, chunk, "").len() + 2
    }

    fn format(
        &self,
        entries: &[ContextEntry],
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok(entries
            .iter()
            .map(|entry| Self::render(entry.index, &entry.chunk, &entry.content))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// `[n]`-numbered passages followed by a source list.
#[derive(Debug, Clone, Copy, Default)]
pub struct CitationFormatter;

impl CitationFormatter {
    fn label(chunk: &Chunk) -> &str {
        chunk.first_meta_str(SOURCE_ALIASES).unwrap_or(&chunk.id)
    }
}

impl ContextFormatter for CitationFormatter {
    fn name(&self) -> &str {
        "citations"
    }

    fn overhead_chars(&self, chunk: &Chunk, index: usize) -> usize {
        // Passage marker, joiner, and this chunk's line in the source list.
        format!("[{index}] ").len() + 2 + format!("[{index}] {}\n", Self::label(chunk)).len()
    }

    fn format(
        &self,
        entries: &[ContextEntry],
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        if entries.is_empty() {
            return Ok(String::new());
        }
        let body = entries
            .iter()
            .map(|entry| format!("[{}] {}", entry.index, entry.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        let sources = entries
            .iter()
            .map(|entry| format!("[{}] {}", entry.index, Self::label(&entry.chunk)))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(format!("{body}\n\nSources:\n{sources}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(index: usize, id: &str, content: &str) -> ContextEntry {
        ContextEntry {
            index,
            chunk: Arc::new(Chunk::new(id, content)),
            content: content.to_string(),
            score: 0.5,
        }
    }

    #[test]
    fn tagged_blocks_carry_index_and_chunk_ref() {
        let formatted = TaggedFormatter
            .format(&[entry(1, "c1", "alpha"), entry(2, "c2", "beta")])
            .unwrap();
        assert!(formatted.contains("<source id=\"1\" ref=\"c1\">\nalpha\n</source>"));
        assert!(formatted.contains("<source id=\"2\" ref=\"c2\">"));
    }

    #[test]
    fn tagged_overhead_matches_rendered_wrapper() {
        let chunk = Chunk::new("c1", "alpha");
        let wrapper = TaggedFormatter::render(1, &chunk, "");
        assert_eq!(
            TaggedFormatter.overhead_chars(&chunk, 1),
            wrapper.len() + 2
        );
    }

    #[test]
    fn citations_list_sources_by_label() {
        let mut second = entry(2, "c2", "beta");
        second.chunk = Arc::new(Chunk::new("c2", "beta").with_meta("source", "guide.md"));

        let formatted = CitationFormatter
            .format(&[entry(1, "c1", "alpha"), second])
            .unwrap();
        assert!(formatted.starts_with("[1] alpha"));
        assert!(formatted.contains("Sources:\n[1] c1\n[2] guide.md"));
    }

    #[test]
    fn empty_entries_format_to_empty_text() {
        assert_eq!(CitationFormatter.format(&[]).unwrap(), "");
        assert_eq!(TaggedFormatter.format(&[]).unwrap(), "");
    }
}
