//! Error types for the muletrace pipeline.

use thiserror::Error;

/// Result type alias using `AnalysisError`.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur while ingesting or analyzing a transaction batch.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// File extension is not one of the supported formats.
    #[error("Unsupported file type: {0} (expected .csv, .tsv, .xls or .xlsx)")]
    UnsupportedFileType(String),

    /// One or more required canonical columns are absent after alias mapping.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Every row was dropped during validation.
    #[error("File contains no valid transactions")]
    NoValidTransactions,

    /// The file could not be decoded in the dispatched format.
    #[error("File parsing error: {0}")]
    ParseError(String),

    /// The analysis was cancelled cooperatively.
    #[error("Analysis cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant broken.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// Create a parse error.
    #[must_use]
    pub fn parse(msg: impl Into<String>) -> Self {
        AnalysisError::ParseError(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        AnalysisError::ConfigError(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        AnalysisError::Internal(msg.into())
    }

    /// Returns true for input-shape errors the caller can fix.
    ///
    /// The transport maps these to HTTP 400; everything else is a 500.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::UnsupportedFileType(_)
                | AnalysisError::MissingColumns(_)
                | AnalysisError::NoValidTransactions
                | AnalysisError::ParseError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(AnalysisError::UnsupportedFileType("report.pdf".into()).is_client_error());
        assert!(AnalysisError::MissingColumns(vec!["amount".into()]).is_client_error());
        assert!(AnalysisError::NoValidTransactions.is_client_error());
        assert!(AnalysisError::parse("bad csv").is_client_error());

        assert!(!AnalysisError::internal("detector panicked").is_client_error());
        assert!(!AnalysisError::Cancelled.is_client_error());
        assert!(!AnalysisError::config("bad toml").is_client_error());
    }

    #[test]
    fn test_missing_columns_detail() {
        let err = AnalysisError::MissingColumns(vec!["amount".into(), "timestamp".into()]);
        assert_eq!(
            err.to_string(),
            "Missing required columns: amount, timestamp"
        );
    }
}
