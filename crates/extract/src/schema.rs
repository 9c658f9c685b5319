use serde::{Deserialize, Serialize};

/// An entity mention as reported by the extraction backend, before
/// normalization. `relation` is an optional free-text hint such as
/// "Related to HIV".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateEntity {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(default)]
    pub relation: Option<String>,
}

/// A relation between two entities, referenced by surface name. Endpoint
/// ids are resolved later against the normalizer's name map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRelation {
    pub entity1: String,
    pub entity2: String,
    pub relation_type: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Wire shape of an entity-extraction response.
#[derive(Debug, Deserialize)]
pub struct EntityResponse {
    pub entities: Vec<CandidateEntity>,
}

/// Wire shape of a relation-extraction response.
#[derive(Debug, Deserialize)]
pub struct RelationResponse {
    pub relations: Vec<CandidateRelation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_payload_tolerates_missing_fields() {
        let json = r#"{"entities": [{"name": "HIV", "type": "Disease"}, {"name": "Treatment"}]}"#;
        let parsed: EntityResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.entities.len(), 2);
        assert_eq!(parsed.entities[0].relation, None);
        assert_eq!(parsed.entities[1].entity_type, "");
    }

    #[test]
    fn relation_payload_parses_optional_confidence() {
        let json = r#"{"relations": [
            {"entity1": "aspirin", "entity2": "fever", "relation_type": "treats", "confidence": 0.9},
            {"entity1": "a", "entity2": "b", "relation_type": "causes"}
        ]}"#;
        let parsed: RelationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.relations[0].confidence, Some(0.9));
        assert_eq!(parsed.relations[1].confidence, None);
    }
}
