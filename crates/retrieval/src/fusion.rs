//! Reciprocal Rank Fusion over per-signal rankings.
//!
//! Rank-based, not score-based: each list contributes `1 / (k + rank)` per
//! item, so wildly different scoring scales fuse without normalization.
//! Every fused result carries one contribution entry per input list, in
//! input-list order, including zero entries for lists that never ranked
//! the item — downstream confidence scoring counts on that invariant.

use ragkit_protocol::{score, Chunk, RankedList};
use std::collections::HashMap;
use std::sync::Arc;

/// RRF constant `k`. Smaller values weight top ranks more heavily.
pub const DEFAULT_RRF_K: f32 = 60.0;

/// One signal's contribution to a fused result.
#[derive(Debug, Clone)]
pub struct SignalContribution {
    pub signal: String,
    /// 1-based rank within the signal's list, when the signal ranked it.
    pub rank: Option<usize>,
    /// The signal's own normalized score, when the signal ranked it.
    pub raw_score: Option<f32>,
    pub contribution: f32,
}

#[derive(Debug, Clone)]
pub struct FusedResult {
    pub id: String,
    pub score: f32,
    pub chunk: Arc<Chunk>,
    /// Exactly one entry per input list, in input-list order.
    pub contributions: Vec<SignalContribution>,
}

/// `1 / (k + rank)` for a 1-based rank.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rrf_score(rank: usize, k: f32) -> f32 {
    1.0 / (k + rank as f32)
}

/// Theoretical maximum fused score: rank 1 in every list.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn max_score(num_lists: usize, k: f32) -> f32 {
    num_lists as f32 / (k + 1.0)
}

/// Fuse N ranked lists into one ordering.
///
/// Results are sorted by fused score descending; equal scores keep
/// first-encountered order (list order, then rank order within a list).
#[must_use]
pub fn fuse(lists: &[RankedList], k: f32) -> Vec<FusedResult> {
    let mut results: Vec<FusedResult> = Vec::new();
    let mut index_of: HashMap<String, usize> = HashMap::new();

    for (list_idx, list) in lists.iter().enumerate() {
        for item in &list.items {
            let idx = match index_of.get(&item.id).copied() {
                Some(idx) => idx,
                None => {
                    let idx = results.len();
                    index_of.insert(item.id.clone(), idx);
                    results.push(FusedResult {
                        id: item.id.clone(),
                        score: 0.0,
                        chunk: Arc::clone(&item.chunk),
                        contributions: lists
                            .iter()
                            .map(|l| SignalContribution {
                                signal: l.signal.clone(),
                                rank: None,
                                raw_score: None,
                                contribution: 0.0,
                            })
                            .collect(),
                    });
                    idx
                }
            };
            let entry = &mut results[idx];

            let contribution = rrf_score(item.rank, k);
            entry.score += contribution;
            let slot = &mut entry.contributions[list_idx];
            slot.rank = Some(item.rank);
            slot.raw_score = Some(item.score);
            slot.contribution = contribution;
        }
    }

    // Stable sort: ties preserve first-encountered order.
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    log::debug!("fused {} lists into {} results", lists.len(), results.len());
    results
}

/// Rescale fused scores against the fixed theoretical bounds
/// `[0, max_score(num_lists, k)]` — not the batch's actual range — so
/// scores stay comparable across queries.
pub fn normalize(results: &mut [FusedResult], num_lists: usize, k: f32) {
    let bound = max_score(num_lists, k);
    if bound <= 0.0 {
        return;
    }
    for result in results {
        result.score = score::clamp01(result.score / bound);
    }
}
