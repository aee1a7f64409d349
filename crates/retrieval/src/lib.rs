//! # Ragkit Retrieval
//!
//! Multi-signal retrieval and fusion: the orchestration layer between the
//! leaf indexes and context assembly.
//!
//! ## Architecture
//!
//! ```text
//! query
//!   │
//!   ├──> DenseRetriever (EmbeddingProvider + VectorStore)
//!   ├──> SparseRetriever (BM25)
//!   └──> graph signal (GraphStore cross-pollination)
//!          │
//!          ├──> weighted blend (HybridRetriever / GraphHybridRetriever)
//!          │      └─ per-signal min-max normalization, alpha blend
//!          │
//!          ├──> rank fusion (RRF over RankedLists)
//!          │      └─ per-signal contribution ledger
//!          │
//!          ├──> ConfidenceScorer (pure, over fusion contributions)
//!          │
//!          └──> rerank pipeline (pluggable ScoringStrategy)
//! ```
//!
//! Signal branches run concurrently; merges are pure functions of their
//! immutable result lists, so completion order never changes the output.
//! Every entry point takes a cancellation token and fails with
//! [`RetrieverError::Cancelled`] rather than returning partial results.

mod confidence;
mod error;
pub mod fusion;
mod graph_hybrid;
mod hybrid;
mod provider;
mod rerank;
mod retriever;

pub use confidence::{
    ConfidenceFactors, ConfidenceScore, ConfidenceScorer, ConfidenceWeights, SignalScores,
};
pub use error::{RerankerError, Result, RetrieverError, COMPONENT};
pub use fusion::{FusedResult, SignalContribution, DEFAULT_RRF_K};
pub use graph_hybrid::{GraphHybridConfig, GraphHybridRetriever};
pub use hybrid::{HybridConfig, HybridResult, HybridRetriever, HybridScore};
pub use provider::{EmbeddingProvider, ProviderError};
pub use rerank::{rerank, RerankOptions, RerankedResult, ScoringStrategy, TermOverlapStrategy};
pub use retriever::{DenseRetriever, Retriever, SparseRetriever};
