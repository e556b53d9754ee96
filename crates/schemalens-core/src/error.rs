//! Error types shared across the analysis pipeline

use thiserror::Error;

/// Result alias for pipeline operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while fetching, decoding or analyzing structured data
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The validator payload could not be parsed into a graph document
    #[error("malformed validator response: {0}")]
    MalformedResponse(String),

    /// A collaborator failed at the transport level
    #[error("fetch failed for {url}: {reason}")]
    FetchFailure { url: String, reason: String },

    /// The input URL produced no analyzable profile
    #[error("analysis failed for {url}: {source}")]
    AnalysisFailed {
        url: String,
        #[source]
        source: Box<AnalysisError>,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl AnalysisError {
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::FetchFailure {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised while loading the reference catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate catalog entry: {0}")]
    DuplicateEntry(String),

    #[error("invalid catalog row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_failed_keeps_the_cause() {
        let err = AnalysisError::AnalysisFailed {
            url: "https://example.com".to_string(),
            source: Box::new(AnalysisError::fetch("https://example.com", "connection reset")),
        };

        let message = err.to_string();
        assert!(message.contains("analysis failed for https://example.com"));
        assert!(message.contains("connection reset"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
