use serde::{Deserialize, Serialize};

/// Common knobs accepted by every retrieval entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    pub top_k: usize,
    /// Drop results scoring below this after normalization.
    pub min_score: Option<f32>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            min_score: None,
        }
    }
}

impl QueryOptions {
    #[must_use]
    pub fn top_k(top_k: usize) -> Self {
        Self {
            top_k,
            ..Self::default()
        }
    }
}
