use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OntologyError {
    #[error("malformed ontology source: {0}")]
    MalformedSource(String),
}

/// One row of the concept table. `parent_id` is empty for roots; the table
/// forms a forest.
#[derive(Debug, Clone, Deserialize)]
pub struct ConceptRow {
    pub concept_id: String,
    pub term: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub parent_id: Option<String>,
}

fn empty_as_none<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(de)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

const REQUIRED_COLUMNS: [&str; 3] = ["concept_id", "term", "parent_id"];

/// Load the concept table from a CSV file with columns
/// `concept_id, term, parent_id`.
///
/// A missing file degrades to an empty table (the run proceeds with no
/// ontology matches); a present but malformed file is a startup failure.
pub fn load_concept_table(path: &Path) -> Result<Vec<ConceptRow>, OntologyError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "ontology table not found, continuing without matches");
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| OntologyError::MalformedSource(e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| OntologyError::MalformedSource(e.to_string()))?
        .clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(OntologyError::MalformedSource(format!(
                "missing required column '{}'",
                column
            )));
        }
    }

    let mut rows = Vec::new();
    for record in reader.deserialize::<ConceptRow>() {
        let row = record.map_err(|e| OntologyError::MalformedSource(e.to_string()))?;
        rows.push(row);
    }

    Ok(rows)
}
