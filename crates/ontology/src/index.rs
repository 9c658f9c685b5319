use crate::table::ConceptRow;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct FuzzyConfig {
    pub enabled: bool,
    /// Minimum similarity (0..=1) for a fuzzy hit. The default only admits
    /// near-identical strings such as minor misspellings.
    pub cutoff: f64,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cutoff: 0.85,
        }
    }
}

/// In-memory concept lookup built once at startup and read-only afterwards.
pub struct OntologyIndex {
    /// normalized term -> concept_id
    terms: HashMap<String, String>,
    /// concept_id -> parent concept_id
    parents: HashMap<String, String>,
    fuzzy: FuzzyConfig,
}

impl OntologyIndex {
    pub fn from_rows(rows: &[ConceptRow], fuzzy: FuzzyConfig) -> Self {
        let known: HashMap<&str, ()> = rows.iter().map(|r| (r.concept_id.as_str(), ())).collect();

        let mut terms = HashMap::new();
        let mut parents = HashMap::new();

        for row in rows {
            terms.insert(normalize_term(&row.term), row.concept_id.clone());
            if let Some(parent_id) = &row.parent_id {
                // A parent pointing at an unknown concept is dropped, not an
                // error.
                if known.contains_key(parent_id.as_str()) {
                    parents.insert(row.concept_id.clone(), parent_id.clone());
                } else {
                    tracing::warn!(
                        concept_id = %row.concept_id,
                        parent_id = %parent_id,
                        "dropping parent link to unknown concept"
                    );
                }
            }
        }

        Self {
            terms,
            parents,
            fuzzy,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Case-insensitive, whitespace-normalized exact match.
    pub fn lookup_exact(&self, term: &str) -> Option<&str> {
        self.terms.get(&normalize_term(term)).map(String::as_str)
    }

    /// Best near-identical match above the similarity cutoff, or none.
    /// Never returns a low-confidence guess.
    pub fn lookup_fuzzy(&self, term: &str) -> Option<&str> {
        if !self.fuzzy.enabled {
            return None;
        }

        let needle = normalize_term(term);
        // (score, matched term, concept id); ties on score break toward the
        // lexicographically smaller term so repeated runs always pick the
        // same concept regardless of map iteration order.
        let mut best: Option<(f64, &str, &str)> = None;

        for (candidate, concept_id) in &self.terms {
            let score = similarity(&needle, candidate);
            if score < self.fuzzy.cutoff {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_score, best_term, _)) => {
                    score > best_score || (score == best_score && candidate.as_str() < best_term)
                }
            };
            if better {
                best = Some((score, candidate, concept_id));
            }
        }

        best.map(|(_, _, id)| id)
    }

    pub fn parent_of(&self, concept_id: &str) -> Option<&str> {
        self.parents.get(concept_id).map(String::as_str)
    }
}

fn normalize_term(term: &str) -> String {
    term.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalized edit-distance similarity: 1.0 for identical strings, 0.0 for
/// completely different ones.
fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f64 / longest as f64
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
