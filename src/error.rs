// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors raised while building or evaluating a queryset
#[derive(Error, Debug)]
pub enum QueryError {
    /// Malformed call arguments
    #[error("Invalid arguments: {0}")]
    Argument(String),

    /// Lookup operator and operand cannot be compiled together
    #[error("Unsupported lookup '{lookup}': {reason}")]
    UnsupportedLookup { lookup: String, reason: String },

    /// Structurally disallowed combination
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Write-style operation on a read-only cursor
    #[error("Operation '{0}' is not available on an Elasticsearch queryset")]
    OperationNotSupported(&'static str),

    /// Direct get found no document
    #[error("Document '{id}' not found in index '{index}'")]
    NotFound { index: String, id: String },

    /// Positional access beyond the available rows
    #[error("Index {index} out of range ({available} rows available)")]
    IndexOutOfRange { index: usize, available: usize },

    /// Transport or search engine failure
    #[error("Search backend error: {0}")]
    Backend(#[from] TransportError),

    /// Document could not be converted
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for queryset operations
pub type Result<T> = std::result::Result<T, QueryError>;

impl QueryError {
    /// Shorthand for an unsupported lookup error
    pub fn unsupported(lookup: impl Into<String>, reason: impl Into<String>) -> Self {
        QueryError::UnsupportedLookup {
            lookup: lookup.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error came from the search backend
    pub fn is_backend(&self) -> bool {
        matches!(self, QueryError::Backend(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::IndexOutOfRange { index: 4, available: 3 };
        assert_eq!(err.to_string(), "Index 4 out of range (3 rows available)");

        let err = QueryError::OperationNotSupported("delete");
        assert_eq!(
            err.to_string(),
            "Operation 'delete' is not available on an Elasticsearch queryset"
        );

        let err = QueryError::unsupported("id__range", "expected a (lower, upper) pair");
        assert_eq!(
            err.to_string(),
            "Unsupported lookup 'id__range': expected a (lower, upper) pair"
        );
    }

    #[test]
    fn test_backend_conversion() {
        let err: QueryError = TransportError::Connection("refused".into()).into();
        assert!(err.is_backend());
        assert!(!QueryError::Argument("x".into()).is_backend());
    }
}
