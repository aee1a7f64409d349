use crate::error::Result;
use crate::hybrid::{
    finish, merge_candidates, validate_weight, HybridConfig, HybridResult, HybridRetriever,
    HybridScore,
};
use crate::retriever::Retriever;
use async_trait::async_trait;
use ragkit_graph::GraphStore;
use ragkit_protocol::{score, QueryOptions, RankedList, RetrievalResult, SIGNAL_GRAPH};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphHybridConfig {
    pub hybrid: HybridConfig,
    /// Weight of the graph component against the dense/sparse blend.
    pub graph_weight: f32,
    /// Chunk metadata field holding the graph node id.
    pub node_field: String,
    /// Traversal depth for cross-pollination neighborhoods.
    pub max_depth: usize,
}

impl Default for GraphHybridConfig {
    fn default() -> Self {
        Self {
            hybrid: HybridConfig::default(),
            graph_weight: 0.3,
            node_field: "node_id".to_string(),
            max_depth: 2,
        }
    }
}

/// Hybrid retrieval with a third, knowledge-graph signal.
///
/// Each candidate chunk maps (via `node_field`) to a graph node; its graph
/// score is how strongly that node connects, within `max_depth` hops, to
/// the nodes of the *other* top candidates ("cross-pollination"). Chunks
/// with no node mapping or no qualifying edges score 0, and an entirely
/// empty graph store is tolerated without error.
pub struct GraphHybridRetriever {
    inner: HybridRetriever,
    graph: Arc<GraphStore>,
    config: GraphHybridConfig,
}

impl GraphHybridRetriever {
    /// Fails with `InvalidWeight` if `graph_weight` is out of range
    /// (alpha is validated by the inner hybrid's construction).
    pub fn new(
        inner: HybridRetriever,
        graph: Arc<GraphStore>,
        config: GraphHybridConfig,
    ) -> Result<Self> {
        validate_weight("graph_weight", config.graph_weight)?;
        Ok(Self {
            inner,
            graph,
            config,
        })
    }

    /// Full retrieval with the three-way score breakdown.
    pub async fn retrieve_hybrid(
        &self,
        query: &str,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<HybridResult>> {
        let (dense_results, sparse_results) =
            self.inner.fetch_signals(query, options, cancel).await?;

        let candidates = merge_candidates(&dense_results, &sparse_results);
        let graph_scores = self.cross_pollination_scores(
            &candidates
                .iter()
                .map(|c| c.chunk.meta_str(&self.config.node_field).map(str::to_owned))
                .collect::<Vec<_>>(),
        );

        let alpha = self.config.hybrid.alpha;
        let graph_weight = self.config.graph_weight;
        let mut results: Vec<HybridResult> = candidates
            .into_iter()
            .zip(graph_scores)
            .map(|(candidate, graph)| {
                let blend = alpha * candidate.dense + (1.0 - alpha) * candidate.sparse;
                let fused = (1.0 - graph_weight) * blend + graph_weight * graph;
                HybridResult {
                    id: candidate.id,
                    chunk: candidate.chunk,
                    scores: HybridScore {
                        dense: candidate.dense,
                        sparse: candidate.sparse,
                        graph: Some(graph),
                        fused,
                    },
                }
            })
            .collect();

        finish(&mut results, options);
        log::info!("graph-hybrid retrieve: {} results", results.len());
        Ok(results)
    }

    /// Branch rankings plus the graph signal as a third [`RankedList`],
    /// from a single signal fan-out.
    pub async fn ranked_lists(
        &self,
        query: &str,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<RankedList>> {
        let (dense_results, sparse_results) =
            self.inner.fetch_signals(query, options, cancel).await?;

        let candidates = merge_candidates(&dense_results, &sparse_results);
        let graph_scores = self.cross_pollination_scores(
            &candidates
                .iter()
                .map(|c| c.chunk.meta_str(&self.config.node_field).map(str::to_owned))
                .collect::<Vec<_>>(),
        );
        let mut graph_signal: Vec<RetrievalResult> = candidates
            .iter()
            .zip(&graph_scores)
            .filter(|(_, &graph)| graph > 0.0)
            .map(|(candidate, &graph)| RetrievalResult {
                id: candidate.id.clone(),
                chunk: Arc::clone(&candidate.chunk),
                score: graph,
            })
            .collect();
        graph_signal.sort_by(|a, b| b.score.total_cmp(&a.score));

        Ok(vec![
            RankedList::from_results(ragkit_protocol::SIGNAL_DENSE, &dense_results),
            RankedList::from_results(ragkit_protocol::SIGNAL_SPARSE, &sparse_results),
            RankedList::from_results(SIGNAL_GRAPH, &graph_signal),
        ])
    }

    /// Graph component per candidate, batch-normalized to `[0, 1]`.
    ///
    /// For candidate `c`, the raw score sums the path strength from every
    /// other candidate's node whose bounded neighborhood reaches `c`'s
    /// node, attenuated by hop count. Two chunks sharing a node count as
    /// maximally connected.
    #[allow(clippy::cast_precision_loss)]
    fn cross_pollination_scores(&self, nodes: &[Option<String>]) -> Vec<f32> {
        if self.graph.node_count() == 0 {
            return vec![0.0; nodes.len()];
        }

        // One bounded neighborhood per distinct candidate node.
        let mut neighborhoods: HashMap<&str, HashMap<String, (usize, f32)>> = HashMap::new();
        for node in nodes.iter().flatten() {
            neighborhoods.entry(node.as_str()).or_insert_with(|| {
                self.graph
                    .neighborhood(node, self.config.max_depth)
                    .into_iter()
                    .map(|neighbor| (neighbor.id, (neighbor.depth, neighbor.strength)))
                    .collect()
            });
        }

        let mut raw: Vec<f32> = vec![0.0; nodes.len()];
        for (i, candidate_node) in nodes.iter().enumerate() {
            let Some(candidate_node) = candidate_node else {
                continue;
            };
            for (j, other_node) in nodes.iter().enumerate() {
                let Some(other_node) = other_node else {
                    continue;
                };
                if i == j {
                    continue;
                }
                if candidate_node == other_node {
                    raw[i] += 1.0;
                    continue;
                }
                if let Some(&(depth, strength)) = neighborhoods
                    .get(other_node.as_str())
                    .and_then(|n| n.get(candidate_node))
                {
                    raw[i] += strength / depth.max(1) as f32;
                }
            }
        }

        if raw.iter().all(|&value| value == 0.0) {
            // No qualifying edges anywhere; normalization would lift a
            // flat batch to 1.0, so leave the zeros alone.
            return raw;
        }
        score::min_max_normalize(&mut raw);
        raw
    }

    #[must_use]
    pub const fn config(&self) -> &GraphHybridConfig {
        &self.config
    }
}

#[async_trait]
impl Retriever for GraphHybridRetriever {
    fn name(&self) -> &str {
        "graph-hybrid"
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
