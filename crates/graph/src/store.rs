use crate::error::{GraphError, Result};
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::Undirected;
use ragkit_protocol::Metadata;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Connection strength in `(0, 1]` by convention.
    pub weight: f32,
    pub label: Option<String>,
}

/// A node reached by bounded-depth traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: String,
    /// Hops from the origin (>= 1; the origin itself is excluded).
    pub depth: usize,
    /// Product of edge weights along the shallowest discovered path.
    pub strength: f32,
}

/// Minimal weighted node/edge store.
///
/// Edges are undirected: the graph signal cares about connectedness, not
/// direction. Mutation assumes a single writer.
#[derive(Default)]
pub struct GraphStore {
    graph: StableGraph<GraphNode, GraphEdge, Undirected>,
    ids: HashMap<String, NodeIndex>,
}

impl GraphStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, or replace its metadata if the id already exists.
    pub fn upsert_node(&mut self, id: impl Into<String>, metadata: Metadata) {
        let id = id.into();
        if let Some(&index) = self.ids.get(&id) {
            self.graph[index].metadata = metadata;
            return;
        }
        let index = self.graph.add_node(GraphNode {
            id: id.clone(),
            metadata,
        });
        self.ids.insert(id, index);
    }

    /// Connect two existing nodes. Fails if either endpoint is missing.
    pub fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        weight: f32,
        label: Option<String>,
    ) -> Result<()> {
        let from = self.index_of(from)?;
        let to = self.index_of(to)?;
        self.graph.add_edge(from, to, GraphEdge { weight, label });
        Ok(())
    }

    /// Remove a node and all its edges. Returns whether it existed.
    pub fn remove_node(&mut self, id: &str) -> bool {
        match self.ids.remove(id) {
            Some(index) => {
                self.graph.remove_node(index);
                true
            }
            None => false,
        }
    }

    /// Remove every edge between two nodes. Returns how many were removed.
    pub fn remove_edges_between(&mut self, a: &str, b: &str) -> usize {
        let (Some(&a), Some(&b)) = (self.ids.get(a), self.ids.get(b)) else {
            return 0;
        };
        let mut removed = 0;
        while let Some(edge) = self.graph.find_edge(a, b) {
            self.graph.remove_edge(edge);
            removed += 1;
        }
        removed
    }

    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    #[must_use]
    pub fn node_metadata(&self, id: &str) -> Option<&Metadata> {
        self.ids.get(id).map(|&index| &self.graph[index].metadata)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.ids.clear();
    }

    /// Breadth-first neighborhood of `id` bounded by `max_depth` hops.
    ///
    /// Each reachable node appears once, at its shallowest depth, with
    /// strength accumulated as the product of edge weights along the path
    /// that first reached it. Missing nodes and empty graphs yield an
    /// empty neighborhood. Output is sorted by (depth, id).
    #[must_use]
    pub fn neighborhood(&self, id: &str, max_depth: usize) -> Vec<Neighbor> {
        let Some(&origin) = self.ids.get(id) else {
            return Vec::new();
        };
        if max_depth == 0 {
            return Vec::new();
        }

        let mut visited: HashSet<NodeIndex> = HashSet::from([origin]);
        let mut queue: VecDeque<(NodeIndex, usize, f32)> = VecDeque::from([(origin, 0, 1.0)]);
        let mut neighbors = Vec::new();

        while let Some((current, depth, strength)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for edge in self.graph.edges(current) {
                let target = if edge.source() == current {
                    edge.target()
                } else {
                    edge.source()
                };
                if !visited.insert(target) {
                    continue;
                }
                let next_strength = strength * edge.weight().weight;
                neighbors.push(Neighbor {
                    id: self.graph[target].id.clone(),
                    depth: depth + 1,
                    strength: next_strength,
                });
                queue.push_back((target, depth + 1, next_strength));
            }
        }

        neighbors.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.id.cmp(&b.id)));
        log::debug!(
            "neighborhood of '{id}' within {max_depth} hops: {} nodes",
            neighbors.len()
        );
        neighbors
    }

    fn index_of(&self, id: &str) -> Result<NodeIndex> {
        self.ids
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }
}
