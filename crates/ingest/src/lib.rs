pub mod chunk;
pub mod chunker;
pub mod reader;

pub use chunk::Chunk;
pub use chunker::{Chunker, ChunkerConfig};
pub use reader::DocumentReader;

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Generate a stable document ID from a file path.
pub fn generate_doc_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Read and chunk a single document.
pub async fn ingest_file(file_path: &Path, config: ChunkerConfig) -> Result<Vec<Chunk>> {
    let content = DocumentReader::read_file(file_path).await?;
    let path_str = file_path.to_string_lossy().to_string();
    let doc_id = generate_doc_id(&path_str);

    let chunker = Chunker::new(config)?;
    Ok(chunker.split(&doc_id, &content, &path_str))
}

/// Read and chunk every supported document under a directory.
pub async fn ingest_directory(dir_path: &Path, config: ChunkerConfig) -> Result<Vec<Chunk>> {
    let files = DocumentReader::read_directory(dir_path).await?;
    let chunker = Chunker::new(config)?;

    let mut all_chunks = Vec::new();
    for (path, content) in files {
        let doc_id = generate_doc_id(&path);
        tracing::debug!(doc_id = %doc_id, source = %path, "chunking document");
        all_chunks.extend(chunker.split(&doc_id, &content, &path));
    }

    Ok(all_chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_is_stable() {
        assert_eq!(generate_doc_id("input/a.txt"), generate_doc_id("input/a.txt"));
        assert_ne!(generate_doc_id("input/a.txt"), generate_doc_id("input/b.txt"));
    }
}
