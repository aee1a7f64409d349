use thiserror::Error;

/// Component name attached to machine-readable error reports.
pub const COMPONENT: &str = "graph";

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),
}

impl GraphError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NodeNotFound(_) => "NODE_NOT_FOUND",
        }
    }
}
