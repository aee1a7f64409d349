use crate::chunk::Chunk;
use std::sync::Arc;

/// Conventional signal names used across the pipeline.
pub const SIGNAL_DENSE: &str = "dense";
pub const SIGNAL_SPARSE: &str = "sparse";
pub const SIGNAL_GRAPH: &str = "graph";

/// One scored hit from a single retriever.
///
/// `score` is normalized to `[0, 1]` within the retriever's own batch;
/// scores from different retrievers are not directly comparable.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub id: String,
    pub chunk: Arc<Chunk>,
    pub score: f32,
}

impl RetrievalResult {
    #[must_use]
    pub fn new(chunk: Arc<Chunk>, score: f32) -> Self {
        Self {
            id: chunk.id.clone(),
            chunk,
            score,
        }
    }
}

/// A result annotated with its 1-based rank within one signal's list.
#[derive(Debug, Clone)]
pub struct RankedItem {
    pub id: String,
    /// 1-based position within the owning list.
    pub rank: usize,
    pub score: f32,
    pub chunk: Arc<Chunk>,
}

/// One signal's full ranking, the unit rank fusion consumes.
#[derive(Debug, Clone)]
pub struct RankedList {
    pub signal: String,
    pub items: Vec<RankedItem>,
}

impl RankedList {
    #[must_use]
    pub fn new(signal: impl Into<String>, items: Vec<RankedItem>) -> Self {
        Self {
            signal: signal.into(),
            items,
        }
    }

    /// Wrap an already-sorted result batch, assigning ranks 1..=n.
    #[must_use]
    pub fn from_results(signal: impl Into<String>, results: &[RetrievalResult]) -> Self {
        let items = results
            .iter()
            .enumerate()
            .map(|(idx, result)| RankedItem {
                id: result.id.clone(),
                rank: idx + 1,
                score: result.score,
                chunk: Arc::clone(&result.chunk),
            })
            .collect();
        Self {
            signal: signal.into(),
            items,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_results_assigns_one_based_ranks() {
        let results: Vec<RetrievalResult> = ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, id)| {
                RetrievalResult::new(Arc::new(Chunk::new(*id, "text")), 1.0 - i as f32 * 0.1)
            })
            .collect();

        let list = RankedList::from_results(SIGNAL_DENSE, &results);

        assert_eq!(list.signal, "dense");
        assert_eq!(list.len(), 3);
        assert_eq!(list.items[0].rank, 1);
        assert_eq!(list.items[2].rank, 3);
        assert_eq!(list.items[2].id, "c");
    }
}
