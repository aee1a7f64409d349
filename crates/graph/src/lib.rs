//! # Ragkit Graph
//!
//! Minimal weighted node/edge store consumed by the graph retrieval
//! signal. Nodes map to chunk metadata; bounded-depth neighborhoods feed
//! the cross-pollination scoring in `ragkit-retrieval`.
//!
//! The store tolerates being empty everywhere: traversals over missing
//! nodes return empty neighborhoods, never errors.

mod error;
mod store;

pub use error::{GraphError, Result, COMPONENT};
pub use store::{GraphEdge, GraphNode, GraphStore, Neighbor};
