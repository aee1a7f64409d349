use crate::provider::ProviderError;
use thiserror::Error;

/// Component name attached to machine-readable error reports.
pub const COMPONENT: &str = "retrieval";

pub type Result<T> = std::result::Result<T, RetrieverError>;

#[derive(Error, Debug)]
pub enum RetrieverError {
    #[error("Query is empty")]
    EmptyQuery,

    #[error("Invalid weight {name}: must be in [0, 1], got {value}")]
    InvalidWeight { name: &'static str, value: f32 },

    #[error("Retrieval cancelled")]
    Cancelled,

    #[error("Embedding provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Vector store error: {0}")]
    VectorStore(#[from] ragkit_vector_store::VectorStoreError),

    #[error("Lexical index error: {0}")]
    Lexical(#[from] ragkit_lexical::LexicalError),
}

impl RetrieverError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyQuery => "EMPTY_QUERY",
            Self::InvalidWeight { .. } => "INVALID_WEIGHT",
            Self::Cancelled => "CANCELLED",
            Self::Provider(_) => "PROVIDER_FAILED",
            Self::VectorStore(_) => "VECTOR_STORE",
            Self::Lexical(_) => "LEXICAL",
        }
    }
}

#[derive(Error, Debug)]
pub enum RerankerError {
    #[error("Query is empty")]
    EmptyQuery,

    #[error("Scoring strategy '{strategy}' failed: {source}")]
    Scoring {
        strategy: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RerankerError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyQuery => "EMPTY_QUERY",
            Self::Scoring { .. } => "SCORING_FAILED",
        }
    }
}
