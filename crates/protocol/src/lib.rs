//! # Ragkit Protocol
//!
//! Shared data model for the retrieval, fusion and assembly pipeline.
//!
//! Every retrieval signal (dense, sparse, graph) produces the same shapes:
//! [`RetrievalResult`] batches scored in `[0, 1]`, convertible into
//! [`RankedList`]s for rank fusion. [`Chunk`] is the single unit of stored
//! content; indexes copy chunks in and share them back as `Arc<Chunk>`.

mod chunk;
mod options;
mod ranked;
pub mod score;

pub use chunk::{Chunk, Metadata};
pub use options::QueryOptions;
pub use ranked::{RankedItem, RankedList, RetrievalResult};
pub use ranked::{SIGNAL_DENSE, SIGNAL_GRAPH, SIGNAL_SPARSE};
