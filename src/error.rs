use thiserror::Error;

/// Failures raised inside the aggregation pipeline.
///
/// `LengthMismatch` and single-item `ProviderError`s are recovered where they
/// happen; `SourceUnavailable` and `NoResults` end the affected language only.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("content source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("no results: {0}")]
    NoResults(String),

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("batch translation returned {actual} items, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PipelineError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            PipelineError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
