//! # Ragkit Vector Store
//!
//! In-memory dense-vector index with cosine similarity search, exact
//! memory accounting and FIFO eviction under a configurable byte budget.
//!
//! ## Architecture
//!
//! ```text
//! Chunk + embedding
//!     │
//!     ├──> Vector Arena (one contiguous f32/f64 buffer, slot-addressed)
//!     │      ├─ free-slot list (delete/upsert reuse)
//!     │      └─ per-slot cosine scoring
//!     │
//!     └──> Store bookkeeping
//!            ├─ id → slot map
//!            ├─ insertion-order queue (FIFO eviction)
//!            └─ eviction hook (once per mutating batch)
//! ```
//!
//! Storage precision is chosen at construction: 32-bit floats halve memory
//! versus 64-bit at a typical similarity deviation under 0.1%.

mod arena;
mod error;
mod store;

pub use arena::Precision;
pub use error::{Result, VectorStoreError, COMPONENT};
pub use store::{
    EvictionHook, MemoryStats, VectorSearchOptions, VectorSearchResult, VectorStore,
    VectorStoreConfig,
};
