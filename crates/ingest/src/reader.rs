use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use walkdir::WalkDir;

/// Reads plain-text documents from disk. PDF and other binary formats are
/// handled by upstream acquisition tooling; this reader only consumes the
/// text they produce.
pub struct DocumentReader;

impl DocumentReader {
    pub async fn read_file(path: &Path) -> Result<String> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "txt" | "md" => fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read file: {:?}", path)),
            _ => anyhow::bail!("Unsupported file format: {}", extension),
        }
    }

    /// Recursively enumerate supported documents under `dir`, returning
    /// (path, content) pairs in path order so runs are reproducible.
    pub async fn read_directory(dir: &Path) -> Result<Vec<(String, String)>> {
        let mut paths = Vec::new();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk directory: {:?}", dir))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let ext = entry.path().extension().and_then(|e| e.to_str());
            if matches!(ext, Some("txt") | Some("md")) {
                paths.push(entry.path().to_path_buf());
            }
        }

        let mut files = Vec::new();
        for path in paths {
            let content = Self::read_file(&path).await?;
            files.push((path.to_string_lossy().to_string(), content));
        }

        Ok(files)
    }
}
