use crate::schema::CandidateEntity;
use ontology::OntologyIndex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[.,!?;:'"]"#).unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// An entity with its stable graph identity assigned: the matched concept id
/// when the ontology knows the name, otherwise a slug of the name itself.
#[derive(Debug, Clone)]
pub struct CanonicalEntity {
    pub id: String,
    pub name: String,
    pub entity_type: String,
    pub concept_id: Option<String>,
    pub parent_id: Option<String>,
    pub relation_hint: Option<String>,
}

/// Output of a normalization pass: the canonical entities plus the surface
/// name -> id map used to resolve relation endpoints.
#[derive(Debug, Default)]
pub struct Normalized {
    pub entities: Vec<CanonicalEntity>,
    pub name_to_id: HashMap<String, String>,
}

pub struct Normalizer<'a> {
    index: &'a OntologyIndex,
}

impl<'a> Normalizer<'a> {
    pub fn new(index: &'a OntologyIndex) -> Self {
        Self { index }
    }

    /// Map candidates to canonical entities: exact ontology match first,
    /// fuzzy second, slug of the name as the fallback. Candidates without a
    /// usable name are skipped.
    pub fn normalize(&self, candidates: &[CandidateEntity]) -> Normalized {
        let mut result = Normalized::default();

        for candidate in candidates {
            let name = candidate.name.trim();
            if name.is_empty() {
                tracing::debug!("skipping candidate entity with empty name");
                continue;
            }

            let concept_id = self
                .index
                .lookup_exact(name)
                .or_else(|| self.index.lookup_fuzzy(name))
                .map(str::to_string);

            let parent_id = concept_id
                .as_deref()
                .and_then(|id| self.index.parent_of(id))
                .map(str::to_string);

            let id = match &concept_id {
                Some(concept_id) => concept_id.clone(),
                None => slugify(name),
            };

            result.name_to_id.insert(name.to_string(), id.clone());
            result.entities.push(CanonicalEntity {
                id,
                name: name.to_string(),
                entity_type: candidate.entity_type.clone(),
                concept_id,
                parent_id,
                relation_hint: candidate.relation.clone(),
            });
        }

        result
    }
}

/// Deterministic fallback id: lowercased, punctuation stripped, whitespace
/// collapsed to underscores. The same surface name always slugs to the same
/// id across runs.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let stripped = PUNCTUATION.replace_all(&lowered, "");
    WHITESPACE.replace_all(stripped.trim(), "_").to_string()
}
