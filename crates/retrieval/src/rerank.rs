//! Post-fusion reranking: a fixed pipeline around a pluggable scoring step.
//!
//! The strategy produces possibly-unbounded raw scores; the pipeline owns
//! normalization, ordering, rank bookkeeping and filtering.

use crate::error::RerankerError;
use async_trait::async_trait;
use ragkit_protocol::{score, Chunk, QueryOptions, RetrievalResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankOptions {
    pub top_k: Option<usize>,
    /// Applies to the normalized rerank score.
    pub min_score: Option<f32>,
}

impl From<&QueryOptions> for RerankOptions {
    fn from(options: &QueryOptions) -> Self {
        Self {
            top_k: Some(options.top_k),
            min_score: options.min_score,
        }
    }
}

/// A reranked result with its before/after breakdown.
#[derive(Debug, Clone)]
pub struct RerankedResult {
    pub id: String,
    pub chunk: Arc<Chunk>,
    /// 1-based position in the input batch.
    pub original_rank: usize,
    /// 1-based position after reranking.
    pub new_rank: usize,
    pub original_score: f32,
    /// Normalized to `[0, 1]` across the batch.
    pub rerank_score: f32,
}

/// The pluggable scoring step of the rerank pipeline.
///
/// Raw scores may be unbounded in either direction; the pipeline min-max
/// normalizes them per batch.
#[async_trait]
pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn score_batch(
        &self,
        query: &str,
        results: &[RetrievalResult],
    ) -> Result<Vec<f32>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Rerank `results` with the injected strategy.
///
/// Empty query fails fast; an empty batch short-circuits to an empty
/// output. A singleton batch (or an all-equal one) normalizes to 1.0,
/// never 0/0. `top_k` and `min_score` combine as an intersection, applied
/// after sorting.
pub async fn rerank(
    strategy: &dyn ScoringStrategy,
    query: &str,
    results: &[RetrievalResult],
    options: &RerankOptions,
) -> Result<Vec<RerankedResult>, RerankerError> {
    if query.trim().is_empty() {
        return Err(RerankerError::EmptyQuery);
    }
    if results.is_empty() {
        return Ok(Vec::new());
    }

    let mut scores = strategy
        .score_batch(query, results)
        .await
        .map_err(|source| RerankerError::Scoring {
            strategy: strategy.name().to_string(),
            source,
        })?;
    if scores.len() != results.len() {
        return Err(RerankerError::Scoring {
            strategy: strategy.name().to_string(),
            source: format!(
                "strategy returned {} scores for {} results",
                scores.len(),
                results.len()
            )
            .into(),
        });
    }

    score::min_max_normalize(&mut scores);

    let mut reranked: Vec<RerankedResult> = results
        .iter()
        .zip(scores)
        .enumerate()
        .map(|(idx, (result, rerank_score))| RerankedResult {
            id: result.id.clone(),
            chunk: Arc::clone(&result.chunk),
            original_rank: idx + 1,
            new_rank: 0,
            original_score: result.score,
            rerank_score,
        })
        .collect();

    reranked.sort_by(|a, b| b.rerank_score.total_cmp(&a.rerank_score));
    for (idx, result) in reranked.iter_mut().enumerate() {
        result.new_rank = idx + 1;
    }

    if let Some(min_score) = options.min_score {
        reranked.retain(|result| result.rerank_score >= min_score);
    }
    if let Some(top_k) = options.top_k {
        reranked.truncate(top_k);
    }

    log::debug!(
        "rerank ({}): {} in, {} out",
        strategy.name(),
        results.len(),
        reranked.len()
    );
    Ok(reranked)
}

/// Dependency-free scoring strategy: query-term overlap weighted by how
/// rare each term is across the batch. A usable default when no LLM or
/// cross-encoder is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermOverlapStrategy;

impl TermOverlapStrategy {
    fn tokens(text: &str) -> Vec<String> {
        let mut tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| token.len() >= 2)
            .map(str::to_lowercase)
            .collect();
        tokens.sort();
        tokens.dedup();
        tokens
    }
}

#[async_trait]
impl ScoringStrategy for TermOverlapStrategy {
    fn name(&self) -> &str {
        "term-overlap"
    }

    #[allow(clippy::cast_precision_loss)]
    async fn score_batch(
        &self,
        query: &str,
        results: &[RetrievalResult],
    ) -> Result<Vec<f32>, Box<dyn std::error::Error + Send + Sync>> {
        let query_terms = Self::tokens(query);
        let contents: Vec<String> = results
            .iter()
            .map(|result| result.chunk.content.to_lowercase())
            .collect();

        // Batch document frequency per query term.
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for term in &query_terms {
            let df = contents.iter().filter(|c| c.contains(term.as_str())).count();
            doc_freq.insert(term, df);
        }

        let n = results.len() as f32;
        Ok(contents
            .iter()
            .map(|content| {
                query_terms
                    .iter()
                    .filter(|term| content.contains(term.as_str()))
                    .map(|term| {
                        let df = doc_freq[term.as_str()].max(1) as f32;
                        (1.0 + n / df).ln()
                    })
                    .sum()
            })
            .collect())
    }
}
