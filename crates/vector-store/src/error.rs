use thiserror::Error;

/// Component name attached to machine-readable error reports.
pub const COMPONENT: &str = "vector-store";

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Chunk '{0}' has no embedding")]
    MissingEmbedding(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl VectorStoreError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::MissingEmbedding(_) => "MISSING_EMBEDDING",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}
