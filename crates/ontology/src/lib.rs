pub mod index;
pub mod table;

pub use index::{FuzzyConfig, OntologyIndex};
pub use table::{ConceptRow, OntologyError, load_concept_table};
