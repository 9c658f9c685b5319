use crate::schema::{CandidateEntity, CandidateRelation};
use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single extraction call. Always recoverable at the chunk
/// level: the pipeline logs it and treats the chunk as having produced
/// nothing.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed extraction response: {0}")]
    MalformedResponse(String),
    #[error("extraction backend error: {0}")]
    Backend(String),
}

/// The boundary to the language-understanding collaborator.
///
/// Calls are side-effect free but not deterministic: repeated calls on the
/// same text may extract differently, and the graph-write layer merges
/// whatever comes back.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract_entities(
        &self,
        chunk_text: &str,
    ) -> Result<Vec<CandidateEntity>, ExtractError>;

    async fn extract_relations(
        &self,
        chunk_text: &str,
    ) -> Result<Vec<CandidateRelation>, ExtractError>;
}
