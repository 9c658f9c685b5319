use crate::contract::{ExtractError, Extractor};
use crate::schema::{CandidateEntity, CandidateRelation};
use async_trait::async_trait;

/// Deterministic extractor used by the mock-extraction switch and in tests.
/// It treats longer words of the chunk as entities and links consecutive
/// ones, which is enough to exercise the persistence path without a model.
pub struct MockExtractor {
    max_entities: usize,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self { max_entities: 5 }
    }

    fn terms(&self, chunk_text: &str) -> Vec<String> {
        let mut seen = Vec::new();
        for word in chunk_text.split_whitespace() {
            let term: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
            if term.chars().count() < 5 {
                continue;
            }
            if !seen.contains(&term) {
                seen.push(term);
            }
            if seen.len() == self.max_entities {
                break;
            }
        }
        seen
    }
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract_entities(
        &self,
        chunk_text: &str,
    ) -> Result<Vec<CandidateEntity>, ExtractError> {
        Ok(self
            .terms(chunk_text)
            .into_iter()
            .map(|name| CandidateEntity {
                name,
                entity_type: "Term".to_string(),
                relation: None,
            })
            .collect())
    }

    async fn extract_relations(
        &self,
        chunk_text: &str,
    ) -> Result<Vec<CandidateRelation>, ExtractError> {
        let terms = self.terms(chunk_text);
        Ok(terms
            .windows(2)
            .map(|pair| CandidateRelation {
                entity1: pair[0].clone(),
                entity2: pair[1].clone(),
                relation_type: "co_occurs_with".to_string(),
                confidence: Some(0.5),
            })
            .collect())
    }
}
