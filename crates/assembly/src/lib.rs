//! # Ragkit Assembly
//!
//! Turns ranked retrieval results into the final context string handed to
//! a language model, with source attributions on the side.
//!
//! The pipeline is fixed; only the formatting step is pluggable:
//!
//! ```text
//! results ──> slice(top_k) ──> dedup(Jaccard) ──> order ──> token budget
//!                                                              │
//!                                attributions <── attribute <──┤
//!                                                              │
//!                         content <── wrap <── format(ContextFormatter)
//! ```
//!
//! Every stage is pure, so assembly is deterministic: identical input and
//! options always yield byte-identical output.

mod assembler;
mod attribution;
mod error;
mod format;
mod options;
pub mod text;

pub use assembler::{AssembledContext, ContextAssembler};
pub use attribution::{Location, SourceAttribution, SOURCE_ALIASES};
pub use error::{AssemblyError, Result, COMPONENT};
pub use format::{CitationFormatter, ContextEntry, ContextFormatter, TaggedFormatter};
pub use options::{
    AssemblyOptions, ContextFormat, DedupOptions, OrderingStrategy, OverflowPolicy,
};
