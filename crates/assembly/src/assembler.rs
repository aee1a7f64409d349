//! The assembly pipeline: slice, dedup, order, budget, attribute, format.
//!
//! Every stage is a pure function of the previous stage's output, so
//! identical input and options always produce byte-identical context.

use crate::attribution::{attribute, SourceAttribution};
use crate::error::{AssemblyError, Result};
use crate::format::{CitationFormatter, ContextEntry, ContextFormatter, TaggedFormatter};
use crate::options::{AssemblyOptions, ContextFormat, OrderingStrategy, OverflowPolicy};
use crate::text::{estimate_tokens, jaccard_similarity, truncate_text};
use ragkit_protocol::{Chunk, RetrievalResult};
use std::sync::Arc;

/// The final product of a retrieval pass.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub content: String,
    /// Token estimate over the complete final string, preamble included.
    pub estimated_tokens: usize,
    pub chunk_count: usize,
    /// Chunks removed as near-duplicates.
    pub deduplicated_count: usize,
    /// Chunks removed by the token budget.
    pub dropped_count: usize,
    pub sources: Vec<SourceAttribution>,
    /// Kept chunks in final context order.
    pub chunks: Vec<Arc<Chunk>>,
}

struct Kept {
    chunk: Arc<Chunk>,
    score: f32,
}

pub struct ContextAssembler {
    options: AssemblyOptions,
    formatter: Box<dyn ContextFormatter>,
}

impl std::fmt::Debug for ContextAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextAssembler")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ContextAssembler {
    /// Fails with `INVALID_INPUT` on an unusable dedup threshold.
    pub fn new(options: AssemblyOptions) -> Result<Self> {
        let formatter: Box<dyn ContextFormatter> = match options.format {
            ContextFormat::Tagged => Box::new(TaggedFormatter),
            ContextFormat::Citations => Box::new(CitationFormatter),
        };
        Self::with_formatter(options, formatter)
    }

    /// Like [`new`], but with a caller-supplied formatter instead of one
    /// of the built-in flavors.
    ///
    /// [`new`]: ContextAssembler::new
    pub fn with_formatter(
        options: AssemblyOptions,
        formatter: Box<dyn ContextFormatter>,
    ) -> Result<Self> {
        let threshold = options.dedup.threshold;
        if !(0.0..=1.0).contains(&threshold) || !threshold.is_finite() {
            return Err(AssemblyError::InvalidInput(format!(
                "dedup threshold must be in [0, 1], got {threshold}"
            )));
        }
        Ok(Self { options, formatter })
    }

    /// Run the full pipeline over relevance-sorted retrieval results.
    pub fn assemble(&self, results: &[RetrievalResult]) -> Result<AssembledContext> {
        for result in results {
            if !result.score.is_finite() {
                return Err(AssemblyError::InvalidInput(format!(
                    "non-finite score for chunk '{}'",
                    result.id
                )));
            }
        }

        let sliced: Vec<Kept> = results
            .iter()
            .take(self.options.top_k.unwrap_or(results.len()))
            .map(|result| Kept {
                chunk: Arc::clone(&result.chunk),
                score: result.score,
            })
            .collect();

        let (deduped, deduplicated_count) = self.dedup(sliced);
        let ordered = self.order(deduped);
        let (entries, dropped_count) = self.budget(ordered);

        let sources: Vec<SourceAttribution> = entries
            .iter()
            .map(|entry| attribute(entry.index, &entry.chunk, entry.score))
            .collect();

        let body = self
            .formatter
            .format(&entries)
            .map_err(|source| AssemblyError::Formatting {
                formatter: self.formatter.name().to_string(),
                source,
            })?;

        let content = self.wrap(body);
        let estimated_tokens = estimate_tokens(&content);
        log::info!(
            "assembled context: {} chunks, ~{estimated_tokens} tokens, {deduplicated_count} deduped, {dropped_count} dropped",
            entries.len()
        );

        Ok(AssembledContext {
            estimated_tokens,
            chunk_count: entries.len(),
            deduplicated_count,
            dropped_count,
            sources,
            chunks: entries.iter().map(|entry| Arc::clone(&entry.chunk)).collect(),
            content,
        })
    }

    /// Greedy near-duplicate pass: a candidate is dropped when its content
    /// is too similar to any already-kept chunk.
    fn dedup(&self, mut candidates: Vec<Kept>) -> (Vec<Kept>, usize) {
        if !self.options.dedup.enabled {
            return (candidates, 0);
        }
        if self.options.dedup.resort_by_score {
            candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        }

        let threshold = self.options.dedup.threshold;
        let mut kept: Vec<Kept> = Vec::with_capacity(candidates.len());
        let mut removed = 0;
        for candidate in candidates {
            let duplicate = kept.iter().any(|existing| {
                jaccard_similarity(&existing.chunk.content, &candidate.chunk.content) >= threshold
            });
            if duplicate {
                removed += 1;
            } else {
                kept.push(candidate);
            }
        }
        (kept, removed)
    }

    fn order(&self, mut kept: Vec<Kept>) -> Vec<Kept> {
        match self.options.ordering {
            OrderingStrategy::Relevance => {
                kept.sort_by(|a, b| b.score.total_cmp(&a.score));
                kept
            }
            OrderingStrategy::Sandwich { start_count } => {
                kept.sort_by(|a, b| b.score.total_cmp(&a.score));
                if kept.len() <= start_count {
                    return kept;
                }
                let tail = kept.split_off(start_count);
                kept.extend(tail.into_iter().rev());
                kept
            }
            OrderingStrategy::Chronological => {
                // Relevance first so the subsequent stable sort breaks
                // document/offset ties by score.
                kept.sort_by(|a, b| b.score.total_cmp(&a.score));
                kept.sort_by(|a, b| {
                    let doc_a = a.chunk.meta_str("document_id").unwrap_or_default();
                    let doc_b = b.chunk.meta_str("document_id").unwrap_or_default();
                    doc_a.cmp(doc_b).then_with(|| {
                        let offset_a = a.chunk.meta_u64("offset").unwrap_or(0);
                        let offset_b = b.chunk.meta_u64("offset").unwrap_or(0);
                        offset_a.cmp(&offset_b)
                    })
                });
                kept
            }
        }
    }

    /// Apply the token budget in context order.
    ///
    /// `drop` skips the offending chunk and keeps evaluating later ones;
    /// `truncate` cuts the offending chunk to the remaining budget and
    /// stops, discarding the rest.
    fn budget(&self, ordered: Vec<Kept>) -> (Vec<ContextEntry>, usize) {
        let Some(max_tokens) = self.options.max_tokens else {
            let entries = ordered
                .into_iter()
                .enumerate()
                .map(|(i, kept)| ContextEntry {
                    index: i + 1,
                    content: kept.chunk.content.clone(),
                    chunk: kept.chunk,
                    score: kept.score,
                })
                .collect();
            return (entries, 0);
        };

        let mut entries: Vec<ContextEntry> = Vec::new();
        let mut used = 0;
        let mut dropped = 0;
        let total = ordered.len();

        for (position, kept) in ordered.into_iter().enumerate() {
            let index = entries.len() + 1;
            let overhead_tokens = self
                .formatter
                .overhead_chars(&kept.chunk, index)
                .div_ceil(4);
            let cost = estimate_tokens(&kept.chunk.content) + overhead_tokens;

            if used + cost <= max_tokens {
                used += cost;
                entries.push(ContextEntry {
                    index,
                    content: kept.chunk.content.clone(),
                    chunk: kept.chunk,
                    score: kept.score,
                });
                continue;
            }

            match self.options.overflow {
                OverflowPolicy::Drop => dropped += 1,
                OverflowPolicy::Truncate => {
                    let remaining = max_tokens.saturating_sub(used).saturating_sub(overhead_tokens);
                    if remaining > 0 {
                        entries.push(ContextEntry {
                            index,
                            content: truncate_text(&kept.chunk.content, remaining * 4),
                            chunk: kept.chunk,
                            score: kept.score,
                        });
                    } else {
                        dropped += 1;
                    }
                    dropped += total - position - 1;
                    break;
                }
            }
        }
        (entries, dropped)
    }

    fn wrap(&self, body: String) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if let Some(preamble) = self.options.preamble.as_deref() {
            parts.push(preamble);
        }
        if !body.is_empty() {
            parts.push(&body);
        }
        if let Some(postamble) = self.options.postamble.as_deref() {
            parts.push(postamble);
        }
        parts.join("\n\n")
    }

    #[must_use]
    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }
}
