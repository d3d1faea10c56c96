use thiserror::Error;

/// Request-time query failures
///
/// Every variant is recovered at the request boundary and mapped to a
/// distinct HTTP status; none of them is fatal to the serving process.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Malformed or missing input, reported before any work is attempted
    #[error("{0}")]
    Validation(String),

    /// POI data (or a structure derived from it) was never loaded
    #[error("{0}")]
    DataUnavailable(String),

    /// Well-formed query with no qualifying record
    #[error("{0}")]
    NoMatch(String),

    /// External routing provider failed
    #[error("{message}")]
    Upstream {
        status: Option<u16>,
        message: String,
        timed_out: bool,
    },
}

impl QueryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        QueryError::Validation(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        QueryError::DataUnavailable(msg.into())
    }

    pub fn no_match(msg: impl Into<String>) -> Self {
        QueryError::NoMatch(msg.into())
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Failures reading, validating or writing a POI dataset
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not a feature collection: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_display() {
        let errors = vec![
            QueryError::validation("lat and lng required"),
            QueryError::unavailable("POI data not loaded"),
            QueryError::no_match("No POI found"),
            QueryError::Upstream {
                status: Some(502),
                message: "bad gateway".to_string(),
                timed_out: false,
            },
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
        assert_eq!(QueryError::no_match("No POI found").to_string(), "No POI found");
    }

    #[test]
    fn test_dataset_error_from_json() {
        let err: DatasetError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(err.to_string().starts_with("Invalid JSON"));
    }
}
