use crate::error::{LexicalError, Result};
use crate::tokenizer::{DefaultTokenizer, Tokenizer};
use ragkit_protocol::{score, Chunk, QueryOptions, RetrievalResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Config {
    /// Term-frequency saturation. Must be >= 0.
    pub k1: f32,
    /// Document-length normalization. Must be in [0, 1].
    pub b: f32,
    /// Terms in fewer documents than this are pruned.
    pub min_doc_freq: usize,
    /// Terms in more than this fraction of documents are pruned.
    pub max_doc_freq_ratio: f32,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: 1.2,
            b: 0.75,
            min_doc_freq: 1,
            max_doc_freq_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    pub document_count: usize,
    pub vocabulary_size: usize,
    pub avg_doc_length: f32,
}

struct Posting {
    doc: usize,
    term_freq: u32,
}

struct BuiltIndex {
    chunks: Vec<Arc<Chunk>>,
    postings: HashMap<String, Vec<Posting>>,
    doc_lengths: Vec<usize>,
    avg_doc_length: f32,
}

/// BM25 inverted index over a chunk corpus.
///
/// Built once per corpus snapshot; rebuild to pick up new documents.
/// Mutation assumes a single writer.
pub struct Bm25Index {
    config: Bm25Config,
    tokenizer: Box<dyn Tokenizer>,
    built: Option<BuiltIndex>,
}

impl std::fmt::Debug for Bm25Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bm25Index")
            .field("config", &self.config)
            .field("built", &self.built.is_some())
            .finish_non_exhaustive()
    }
}

impl Bm25Index {
    /// Create an index with the default tokenizer.
    ///
    /// Fails fast on out-of-range `k1`/`b`.
    pub fn new(config: Bm25Config) -> Result<Self> {
        Self::with_tokenizer(config, Box::new(DefaultTokenizer))
    }

    pub fn with_tokenizer(config: Bm25Config, tokenizer: Box<dyn Tokenizer>) -> Result<Self> {
        if config.k1 < 0.0 {
            return Err(LexicalError::InvalidParameter {
                name: "k1",
                reason: format!("must be >= 0, got {}", config.k1),
            });
        }
        if !(0.0..=1.0).contains(&config.b) {
            return Err(LexicalError::InvalidParameter {
                name: "b",
                reason: format!("must be in [0, 1], got {}", config.b),
            });
        }
        Ok(Self {
            config,
            tokenizer,
            built: None,
        })
    }

    /// Tokenize all documents and build the pruned inverted index.
    #[allow(clippy::cast_precision_loss)]
    pub fn build_index(&mut self, documents: &[Chunk]) {
        let doc_count = documents.len();
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(doc_count);

        for (doc, document) in documents.iter().enumerate() {
            let tokens = self.tokenizer.tokenize(&document.content);
            doc_lengths.push(tokens.len());

            let mut term_freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *term_freqs.entry(token).or_insert(0) += 1;
            }
            for (term, term_freq) in term_freqs {
                postings
                    .entry(term)
                    .or_default()
                    .push(Posting { doc, term_freq });
            }
        }

        // Prune terms outside the [min_doc_freq, max_doc_freq_ratio * N] window.
        let max_doc_freq = self.config.max_doc_freq_ratio * doc_count as f32;
        let before = postings.len();
        postings.retain(|_, entries| {
            let df = entries.len();
            df >= self.config.min_doc_freq && df as f32 <= max_doc_freq
        });
        log::debug!(
            "BM25 index built: {doc_count} documents, {} terms ({} pruned)",
            postings.len(),
            before - postings.len()
        );

        let avg_doc_length = if doc_count == 0 {
            0.0
        } else {
            doc_lengths.iter().sum::<usize>() as f32 / doc_count as f32
        };

        self.built = Some(BuiltIndex {
            chunks: documents.iter().cloned().map(Arc::new).collect(),
            postings,
            doc_lengths,
            avg_doc_length,
        });
    }

    /// Score every document containing at least one query term.
    ///
    /// Scores are min-max normalized across the batch; raw BM25 magnitude
    /// never leaves this component.
    #[allow(clippy::cast_precision_loss)]
    pub fn retrieve(&self, query: &str, options: &QueryOptions) -> Result<Vec<RetrievalResult>> {
        let built = self.built.as_ref().ok_or(LexicalError::NotBuilt)?;
        if query.trim().is_empty() {
            return Err(LexicalError::EmptyQuery);
        }

        let query_terms = self.tokenizer.tokenize(query);
        let doc_count = built.chunks.len();
        let mut raw_scores: HashMap<usize, f32> = HashMap::new();

        for term in &query_terms {
            let Some(entries) = built.postings.get(term) else {
                continue;
            };
            let idf = idf(doc_count, entries.len());
            for posting in entries {
                let term_freq = posting.term_freq as f32;
                let doc_length = built.doc_lengths[posting.doc] as f32;
                let length_norm = 1.0 - self.config.b
                    + self.config.b * doc_length / built.avg_doc_length.max(f32::EPSILON);
                let term_score = idf * term_freq * (self.config.k1 + 1.0)
                    / (term_freq + self.config.k1 * length_norm);
                *raw_scores.entry(posting.doc).or_insert(0.0) += term_score;
            }
        }

        // Collect in document-insertion order so normalization and the
        // stable sort below stay deterministic.
        let mut docs: Vec<usize> = raw_scores.keys().copied().collect();
        docs.sort_unstable();
        let mut scores: Vec<f32> = docs.iter().map(|doc| raw_scores[doc]).collect();
        score::min_max_normalize(&mut scores);

        let mut results: Vec<RetrievalResult> = docs
            .into_iter()
            .zip(scores)
            .map(|(doc, normalized)| {
                RetrievalResult::new(Arc::clone(&built.chunks[doc]), normalized)
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        if let Some(min_score) = options.min_score {
            results.retain(|result| result.score >= min_score);
        }
        results.truncate(options.top_k);

        log::debug!(
            "BM25 retrieve: {} query terms, {} results",
            query_terms.len(),
            results.len()
        );
        Ok(results)
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }

    #[must_use]
    pub fn stats(&self) -> Option<IndexStats> {
        self.built.as_ref().map(|built| IndexStats {
            document_count: built.chunks.len(),
            vocabulary_size: built.postings.len(),
            avg_doc_length: built.avg_doc_length,
        })
    }

    pub fn clear(&mut self) {
        self.built = None;
    }
}

/// `ln((N - df + 0.5) / (df + 0.5) + 1)` — strictly favors rarer terms.
#[allow(clippy::cast_precision_loss)]
fn idf(doc_count: usize, doc_freq: usize) -> f32 {
    let n = doc_count as f32;
    let df = doc_freq as f32;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}
