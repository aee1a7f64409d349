use serde::{Deserialize, Serialize};

/// Near-duplicate filtering over chunk content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupOptions {
    pub enabled: bool,
    /// Jaccard similarity at or above which a candidate is dropped.
    pub threshold: f32,
    /// Re-sort by score descending before the greedy pass, so the
    /// higher-scored member of a duplicate pair survives.
    pub resort_by_score: bool,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.8,
            resort_by_score: true,
        }
    }
}

/// How kept chunks are arranged in the final context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum OrderingStrategy {
    /// Score descending.
    #[default]
    Relevance,
    /// Strongest items at both edges of the context, weakest in the
    /// middle, where model attention decays: keep the top `start_count`
    /// in place, reverse the rest and append.
    Sandwich { start_count: usize },
    /// Document id, then character offset; ties keep relevance order.
    Chronological,
}

/// What happens to the first chunk that does not fit the token budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Skip the offending chunk; later, smaller chunks may still fit.
    Drop,
    /// Cut the offending chunk at a word boundary near the remaining
    /// budget and stop. Deliberately does not try to pack later chunks
    /// into whatever space the cut leaves over.
    #[default]
    Truncate,
}

/// Output flavor of the assembled context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextFormat {
    /// `<source>`-tagged blocks, one per chunk.
    #[default]
    Tagged,
    /// `[n]`-numbered passages with a trailing source list.
    Citations,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyOptions {
    /// Keep at most this many input results before any other stage runs.
    pub top_k: Option<usize>,
    pub dedup: DedupOptions,
    pub ordering: OrderingStrategy,
    /// Token budget over the formatted chunks. `None` disables budgeting.
    pub max_tokens: Option<usize>,
    pub overflow: OverflowPolicy,
    pub format: ContextFormat,
    pub preamble: Option<String>,
    pub postamble: Option<String>,
}
