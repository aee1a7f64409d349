use thiserror::Error;

/// Component name attached to machine-readable error reports.
pub const COMPONENT: &str = "assembly";

pub type Result<T> = std::result::Result<T, AssemblyError>;

#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Formatter '{formatter}' failed: {source}")]
    Formatting {
        formatter: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl AssemblyError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Formatting { .. } => "FORMATTING_FAILED",
        }
    }
}
