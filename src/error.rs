//! Error types for the anomaly-scoring pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for pipeline operations
#[derive(Debug, Error)]
pub enum Error {
    /// Backend unreachable or transport-level failure
    #[error("metric source unavailable: {0}")]
    SourceUnavailable(String),

    /// Valid query, zero data points
    #[error("query returned no data points")]
    EmptyResult,

    /// Unexpected payload shape
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    /// Too few samples reached the model
    #[error("insufficient data: got {got} samples, need at least {min}")]
    InsufficientData { got: usize, min: usize },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// A transient failure is worth retrying; everything else is terminal.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::SourceUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_detail() {
        let err = Error::MalformedResponse("series result missing value field".to_string());
        assert!(err.to_string().contains("missing value field"));

        let err = Error::InsufficientData { got: 1, min: 2 };
        assert!(err.to_string().contains("got 1"));
    }

    #[test]
    fn test_only_source_failures_are_transient() {
        assert!(Error::SourceUnavailable("connection refused".to_string()).is_transient());
        assert!(!Error::EmptyResult.is_transient());
        assert!(!Error::MalformedResponse("bad".to_string()).is_transient());
        assert!(!Error::InsufficientData { got: 0, min: 2 }.is_transient());
    }
}
