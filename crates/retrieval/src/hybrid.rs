use crate::error::{Result, RetrieverError};
use crate::retriever::{DenseRetriever, Retriever, SparseRetriever};
use async_trait::async_trait;
use ragkit_protocol::{Chunk, QueryOptions, RankedList, RetrievalResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    /// Dense weight in the blend: `fused = alpha·dense + (1−alpha)·sparse`.
    pub alpha: f32,
    /// Each branch fetches `top_k * candidate_multiplier` candidates so the
    /// blend has enough overlap to work with.
    pub candidate_multiplier: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            alpha: 0.7,
            candidate_multiplier: 4,
        }
    }
}

/// Per-result component breakdown. Every component is independently
/// normalized to `[0, 1]` within its own signal batch; `fused` is the blend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridScore {
    pub dense: f32,
    pub sparse: f32,
    pub graph: Option<f32>,
    pub fused: f32,
}

#[derive(Debug, Clone)]
pub struct HybridResult {
    pub id: String,
    pub chunk: Arc<Chunk>,
    pub scores: HybridScore,
}

impl HybridResult {
    #[must_use]
    pub fn to_retrieval_result(&self) -> RetrievalResult {
        RetrievalResult {
            id: self.id.clone(),
            chunk: Arc::clone(&self.chunk),
            score: self.scores.fused,
        }
    }
}

/// Runs dense and sparse retrieval concurrently and blends the scores.
pub struct HybridRetriever {
    dense: DenseRetriever,
    sparse: SparseRetriever,
    config: HybridConfig,
}

impl HybridRetriever {
    /// Fails with [`RetrieverError::InvalidWeight`] if `alpha` is out of range.
    pub fn new(dense: DenseRetriever, sparse: SparseRetriever, config: HybridConfig) -> Result<Self> {
        validate_weight("alpha", config.alpha)?;
        Ok(Self {
            dense,
            sparse,
            config,
        })
    }

    /// Full retrieval with the per-signal score breakdown.
    pub async fn retrieve_hybrid(
        &self,
        query: &str,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<HybridResult>> {
        let (dense_results, sparse_results) = self.fetch_signals(query, options, cancel).await?;

        let mut results: Vec<HybridResult> = merge_candidates(&dense_results, &sparse_results)
            .into_iter()
            .map(|candidate| {
                let fused = self.config.alpha * candidate.dense
                    + (1.0 - self.config.alpha) * candidate.sparse;
                HybridResult {
                    id: candidate.id,
                    chunk: candidate.chunk,
                    scores: HybridScore {
                        dense: candidate.dense,
                        sparse: candidate.sparse,
                        graph: None,
                        fused,
                    },
                }
            })
            .collect();

        finish(&mut results, options);
        log::info!("hybrid retrieve: {} results", results.len());
        Ok(results)
    }

    /// Both branch rankings, ready for rank fusion and confidence scoring.
    pub async fn ranked_lists(
        &self,
        query: &str,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<RankedList>> {
        let (dense_results, sparse_results) = self.fetch_signals(query, options, cancel).await?;
        Ok(vec![
            RankedList::from_results(self.dense.name(), &dense_results),
            RankedList::from_results(self.sparse.name(), &sparse_results),
        ])
    }

    /// Run both branches concurrently. The merge downstream is a pure
    /// function of the returned lists, so completion order is irrelevant;
    /// cancellation aborts both branches and fails the whole operation.
    pub(crate) async fn fetch_signals(
        &self,
        query: &str,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<(Vec<RetrievalResult>, Vec<RetrievalResult>)> {
        if query.trim().is_empty() {
            return Err(RetrieverError::EmptyQuery);
        }

        let pool_options = QueryOptions {
            top_k: candidate_pool(options.top_k, self.config.candidate_multiplier),
            min_score: None,
        };

        let branches = async {
            tokio::try_join!(
                self.dense.retrieve(query, &pool_options, cancel),
                self.sparse.retrieve(query, &pool_options, cancel),
            )
        };
        tokio::select! {
            () = cancel.cancelled() => Err(RetrieverError::Cancelled),
            joined = branches => {
                let (dense_results, sparse_results) = joined?;
                log::debug!(
                    "signal fan-out: dense={}, sparse={}",
                    dense_results.len(),
                    sparse_results.len()
                );
                Ok((dense_results, sparse_results))
            }
        }
    }

    #[must_use]
    pub const fn config(&self) -> &HybridConfig {
        &self.config
    }
}

#[async_trait]
impl Retriever for HybridRetriever {
    fn name(&self) -> &str {
        "hybrid"
    }

    async fn retrieve(
        &self,
        query: &str,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<RetrievalResult>> {
        let results = self.retrieve_hybrid(query, options, cancel).await?;
        Ok(results
            .iter()
            .map(HybridResult::to_retrieval_result)
            .collect())
    }
}

pub(crate) fn validate_weight(name: &'static str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) || !value.is_finite() {
        return Err(RetrieverError::InvalidWeight { name, value });
    }
    Ok(())
}

pub(crate) fn candidate_pool(top_k: usize, multiplier: usize) -> usize {
    top_k.max(1) * multiplier.max(1)
}

pub(crate) struct Candidate {
    pub id: String,
    pub chunk: Arc<Chunk>,
    pub dense: f32,
    pub sparse: f32,
}

/// Union of both batches in deterministic order: dense hits first, then
/// sparse-only hits in sparse order. A signal that never saw a candidate
/// contributes component score 0, never NaN.
pub(crate) fn merge_candidates(
    dense: &[RetrievalResult],
    sparse: &[RetrievalResult],
) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::with_capacity(dense.len() + sparse.len());
    let mut index_of: HashMap<String, usize> = HashMap::new();

    for result in dense {
        index_of.insert(result.id.clone(), candidates.len());
        candidates.push(Candidate {
            id: result.id.clone(),
            chunk: Arc::clone(&result.chunk),
            dense: result.score,
            sparse: 0.0,
        });
    }
    for result in sparse {
        match index_of.get(&result.id) {
            Some(&idx) => candidates[idx].sparse = result.score,
            None => candidates.push(Candidate {
                id: result.id.clone(),
                chunk: Arc::clone(&result.chunk),
                dense: 0.0,
                sparse: result.score,
            }),
        }
    }
    candidates
}

/// Sort by fused score descending (stable), filter, truncate.
pub(crate) fn finish(results: &mut Vec<HybridResult>, options: &QueryOptions) {
    results.sort_by(|a, b| b.scores.fused.total_cmp(&a.scores.fused));
    if let Some(min_score) = options.min_score {
        results.retain(|result| result.scores.fused >= min_score);
    }
    results.truncate(options.top_k);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result(id: &str, score: f32) -> RetrievalResult {
        RetrievalResult::new(Arc::new(Chunk::new(id, format!("content {id}"))), score)
    }

    #[test]
    fn merge_keeps_deterministic_order_and_zero_fills() {
        let dense = vec![result("a", 1.0), result("b", 0.5)];
        let sparse = vec![result("b", 1.0), result("c", 0.2)];

        let merged = merge_candidates(&dense, &sparse);
        let ids: Vec<&str> = merged.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(merged[0].sparse, 0.0);
        assert_eq!(merged[1].dense, 0.5);
        assert_eq!(merged[1].sparse, 1.0);
        assert_eq!(merged[2].dense, 0.0);
    }

    #[test]
    fn weight_validation_bounds() {
        assert!(validate_weight("alpha", 0.0).is_ok());
        assert!(validate_weight("alpha", 1.0).is_ok());
        assert!(validate_weight("alpha", 1.1).is_err());
        assert!(validate_weight("alpha", -0.1).is_err());
        assert!(validate_weight("alpha", f32::NAN).is_err());
    }

    #[test]
    fn candidate_pool_never_collapses_to_zero() {
        assert_eq!(candidate_pool(0, 0), 1);
        assert_eq!(candidate_pool(10, 4), 40);
    }
}
