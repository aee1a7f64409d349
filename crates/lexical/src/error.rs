use thiserror::Error;

/// Component name attached to machine-readable error reports.
pub const COMPONENT: &str = "lexical";

pub type Result<T> = std::result::Result<T, LexicalError>;

#[derive(Error, Debug)]
pub enum LexicalError {
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },

    #[error("Index has not been built")]
    NotBuilt,

    #[error("Query is empty")]
    EmptyQuery,
}

impl LexicalError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::NotBuilt => "NOT_BUILT",
            Self::EmptyQuery => "EMPTY_QUERY",
        }
    }
}
