pub mod contract;
pub mod llm;
pub mod mock;
pub mod normalizer;
pub mod prompt;
pub mod schema;

pub use contract::{ExtractError, Extractor};
pub use llm::{OllamaClient, OllamaExtractor};
pub use mock::MockExtractor;
pub use normalizer::{CanonicalEntity, Normalized, Normalizer, slugify};
pub use schema::{CandidateEntity, CandidateRelation};
