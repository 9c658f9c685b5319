use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub doc_id: String,
    pub chunk_id: String,
    pub text: String,
    pub source: String,
    pub index: usize,
}

impl Chunk {
    pub fn new(doc_id: &str, index: usize, text: String, source: &str) -> Self {
        let chunk_id = Self::generate_chunk_id(doc_id, index);

        Self {
            doc_id: doc_id.to_string(),
            chunk_id,
            text,
            source: source.to_string(),
            index,
        }
    }

    /// Chunk ids are a pure function of (document, position) so that
    /// re-chunking the same input yields the same ids.
    fn generate_chunk_id(doc_id: &str, index: usize) -> String {
        format!("{}#{}", doc_id, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_is_deterministic() {
        let a = Chunk::new("doc-1", 3, "text".to_string(), "notes.md");
        let b = Chunk::new("doc-1", 3, "different text".to_string(), "notes.md");
        assert_eq!(a.chunk_id, b.chunk_id);
        assert_eq!(a.chunk_id, "doc-1#3");
    }

    #[test]
    fn chunk_id_varies_by_position() {
        let a = Chunk::new("doc-1", 0, "text".to_string(), "notes.md");
        let b = Chunk::new("doc-1", 1, "text".to_string(), "notes.md");
        assert_ne!(a.chunk_id, b.chunk_id);
    }
}
