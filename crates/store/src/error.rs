use thiserror::Error;

/// Store failure taxonomy. Transient errors are retried by the writer;
/// authentication failures and retry exhaustion are fatal to the run;
/// unresolved endpoints are recoverable per relation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("store unavailable after {attempts} attempts: {detail}")]
    Unavailable { attempts: usize, detail: String },

    #[error("transient store error: {0}")]
    Transient(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("relation endpoint not found: {0}")]
    UnresolvedRelationEndpoint(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }

    /// Fatal errors abort the whole run; everything else is handled at a
    /// smaller scope.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::AuthenticationFailure(_) | StoreError::Unavailable { .. }
        )
    }

    /// Classify a driver error: connection-level problems are retryable,
    /// credential problems are not.
    pub fn from_driver(err: neo4rs::Error) -> Self {
        match err {
            neo4rs::Error::AuthenticationError(detail) => StoreError::AuthenticationFailure(detail),
            neo4rs::Error::ConnectionError => {
                StoreError::Transient("connection unavailable".to_string())
            }
            neo4rs::Error::IOError { detail } => StoreError::Transient(detail.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}
