//! Trust scoring over fusion contributions.
//!
//! Pure functions of an immutable [`FusedResult`] snapshot: no state, no
//! side effects, trivially testable.

use crate::error::{Result, RetrieverError};
use crate::fusion::FusedResult;
use ragkit_protocol::{score, SIGNAL_DENSE, SIGNAL_GRAPH, SIGNAL_SPARSE};
use serde::{Deserialize, Serialize};

/// Factor weights. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub rank_agreement: f32,
    pub score_consistency: f32,
    pub multi_signal_presence: f32,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            rank_agreement: 0.4,
            score_consistency: 0.3,
            multi_signal_presence: 0.3,
        }
    }
}

impl ConfidenceWeights {
    #[must_use]
    pub fn sum(&self) -> f32 {
        self.rank_agreement + self.score_consistency + self.multi_signal_presence
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceFactors {
    pub rank_agreement: f32,
    pub score_consistency: f32,
    pub multi_signal_presence: f32,
    /// How many signals actually ranked this item with a positive score.
    pub signal_count: usize,
    pub all_present: bool,
}

/// Per-signal raw scores under their conventional names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalScores {
    pub vector_similarity: Option<f32>,
    pub keyword_match: Option<f32>,
    pub graph_context: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceScore {
    pub overall: f32,
    pub factors: ConfidenceFactors,
    pub signals: SignalScores,
}

/// Computes a trust score from how strongly the signals agree on a result.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceScorer {
    weights: ConfidenceWeights,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self {
            weights: ConfidenceWeights::default(),
        }
    }
}

impl ConfidenceScorer {
    /// Fails unless the weights sum to 1.0 (within floating tolerance).
    pub fn new(weights: ConfidenceWeights) -> Result<Self> {
        if (weights.sum() - 1.0).abs() > 1e-6 {
            return Err(RetrieverError::InvalidWeight {
                name: "confidence_weights",
                value: weights.sum(),
            });
        }
        Ok(Self { weights })
    }

    /// Score one fused result against the pool it was drawn from.
    ///
    /// `total_signals` is the number of configured signals (input lists);
    /// `pool_size` is the candidate pool each rank is normalized against.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn score(
        &self,
        result: &FusedResult,
        total_signals: usize,
        pool_size: usize,
    ) -> ConfidenceScore {
        let present: Vec<&crate::fusion::SignalContribution> = result
            .contributions
            .iter()
            .filter(|c| c.rank.is_some() && c.raw_score.unwrap_or(0.0) > 0.0)
            .collect();

        // Rank agreement: variance of pool-normalized ranks. A single
        // ranking signal has zero variance and trivially "agrees"; the
        // presence factor penalizes it instead.
        let rank_agreement = if pool_size == 0 {
            0.0
        } else {
            let normalized: Vec<f32> = present
                .iter()
                .filter_map(|c| c.rank)
                .map(|rank| rank as f32 / pool_size as f32)
                .collect();
            score::clamp01(1.0 - score::population_variance(&normalized))
        };

        // Score consistency over positive raw scores; single-signal and
        // all-zero cases are consistent by convention.
        let positive: Vec<f32> = present.iter().filter_map(|c| c.raw_score).collect();
        let score_consistency = if positive.len() < 2 {
            1.0
        } else {
            score::clamp01(1.0 - score::population_variance(&positive))
        };

        let signal_count = present.len();
        let multi_signal_presence = if total_signals == 0 {
            0.0
        } else {
            signal_count as f32 / total_signals as f32
        };

        let mut signals = SignalScores::default();
        for contribution in &result.contributions {
            let raw = contribution.raw_score;
            match contribution.signal.as_str() {
                SIGNAL_DENSE => signals.vector_similarity = raw,
                SIGNAL_SPARSE => signals.keyword_match = raw,
                SIGNAL_GRAPH => signals.graph_context = raw,
                _ => {}
            }
        }

        let overall = score::clamp01(
            self.weights.rank_agreement * rank_agreement
                + self.weights.score_consistency * score_consistency
                + self.weights.multi_signal_presence * multi_signal_presence,
        );

        ConfidenceScore {
            overall,
            factors: ConfidenceFactors {
                rank_agreement,
                score_consistency,
                multi_signal_presence,
                signal_count,
                all_present: total_signals > 0 && signal_count == total_signals,
            },
            signals,
        }
    }

    #[must_use]
    pub const fn weights(&self) -> ConfidenceWeights {
        self.weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::{fuse, DEFAULT_RRF_K};
    use pretty_assertions::assert_eq;
    use ragkit_protocol::{Chunk, RankedList, RetrievalResult};
    use std::sync::Arc;

    fn list(signal: &str, scored: &[(&str, f32)]) -> RankedList {
        let results: Vec<RetrievalResult> = scored
            .iter()
            .map(|(id, score)| {
                RetrievalResult::new(Arc::new(Chunk::new(*id, format!("content {id}"))), *score)
            })
            .collect();
        RankedList::from_results(signal, &results)
    }

    #[test]
    fn default_weights_sum_to_one() {
        let weights = ConfidenceWeights::default();
        assert!((weights.sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_weights_that_do_not_sum_to_one() {
        let err = ConfidenceScorer::new(ConfidenceWeights {
            rank_agreement: 0.5,
            score_consistency: 0.5,
            multi_signal_presence: 0.5,
        })
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_WEIGHT");
    }

    #[test]
    fn agreement_high_when_signals_rank_alike() {
        let lists = vec![
            list("dense", &[("a", 0.9), ("b", 0.5)]),
            list("sparse", &[("a", 0.8), ("b", 0.4)]),
        ];
        let fused = fuse(&lists, DEFAULT_RRF_K);
        let scorer = ConfidenceScorer::default();

        let a = scorer.score(&fused[0], 2, 10);
        assert!(a.factors.rank_agreement > 0.99);
        assert!(a.factors.all_present);
        assert_eq!(a.factors.signal_count, 2);
        assert_eq!(a.signals.vector_similarity, Some(0.9));
        assert_eq!(a.signals.keyword_match, Some(0.8));
        assert_eq!(a.signals.graph_context, None);
    }

    #[test]
    fn single_signal_agrees_trivially_but_presence_penalizes() {
        let lists = vec![
            list("dense", &[("solo", 0.9)]),
            list("sparse", &[("other", 0.8)]),
        ];
        let fused = fuse(&lists, DEFAULT_RRF_K);
        let solo = fused.iter().find(|r| r.id == "solo").unwrap();

        let confidence = ConfidenceScorer::default().score(solo, 2, 10);
        assert_eq!(confidence.factors.rank_agreement, 1.0);
        assert_eq!(confidence.factors.score_consistency, 1.0);
        assert!((confidence.factors.multi_signal_presence - 0.5).abs() < 1e-6);
        assert!(!confidence.factors.all_present);
    }

    #[test]
    fn zero_candidate_pool_never_divides_by_zero() {
        let lists = vec![list("dense", &[("a", 0.9)])];
        let fused = fuse(&lists, DEFAULT_RRF_K);

        let confidence = ConfidenceScorer::default().score(&fused[0], 1, 0);
        assert_eq!(confidence.factors.rank_agreement, 0.0);
        assert!(confidence.overall.is_finite());
    }

    #[test]
    fn zero_score_contribution_does_not_count_as_present() {
        let lists = vec![
            list("dense", &[("a", 0.9)]),
            list("sparse", &[("a", 0.0)]),
        ];
        let fused = fuse(&lists, DEFAULT_RRF_K);

        let confidence = ConfidenceScorer::default().score(&fused[0], 2, 10);
        assert_eq!(confidence.factors.signal_count, 1);
        assert!(!confidence.factors.all_present);
    }

    #[test]
    fn overall_stays_in_unit_interval() {
        let lists = vec![
            list("dense", &[("a", 1.0), ("b", 0.1)]),
            list("sparse", &[("b", 1.0), ("a", 0.1)]),
            list("graph", &[("a", 0.5)]),
        ];
        let fused = fuse(&lists, DEFAULT_RRF_K);
        let scorer = ConfidenceScorer::default();
        for result in &fused {
            let confidence = scorer.score(result, 3, 2);
            assert!((0.0..=1.0).contains(&confidence.overall));
        }
    }
}
