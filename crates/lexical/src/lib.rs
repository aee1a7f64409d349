//! # Ragkit Lexical
//!
//! Inverted-index BM25 scorer: the sparse signal of the retrieval pipeline.
//!
//! Raw BM25 magnitudes never leave this crate; every result batch is
//! min-max normalized to `[0, 1]` so downstream fusion can blend the
//! lexical signal against dense similarity on a shared scale.

mod error;
mod index;
mod tokenizer;

pub use error::{LexicalError, Result, COMPONENT};
pub use index::{Bm25Config, Bm25Index, IndexStats};
pub use tokenizer::{DefaultTokenizer, Tokenizer};
