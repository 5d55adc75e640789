use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

use super::api::ApiParser;
use crate::models::chunk::Chunk;

/// A parsed document: its chunks plus the source filename.
#[derive(Debug)]
pub struct LoadedDocument {
    pub filename: String,
    pub chunks: Vec<Chunk>,
}

/// Loads every PDF under a folder of the shared data root, extracts text via
/// the parser API, and splits it into overlapping chunks.
pub struct DirectoryLoader {
    shared_data_root: PathBuf,
    parser: ApiParser,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DirectoryLoader {
    pub fn new(
        shared_data_root: &str,
        parser: ApiParser,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            shared_data_root: PathBuf::from(shared_data_root),
            parser,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Load all PDFs under `{shared_data_root}/{shared_folder}`.
    /// Fails before any external call when the folder is missing or holds no
    /// PDF files.
    pub async fn load_folder(&self, shared_folder: &str) -> anyhow::Result<Vec<LoadedDocument>> {
        let folder = self.shared_data_root.join(shared_folder);
        if !folder.is_dir() {
            anyhow::bail!("Shared folder not found: {}", folder.display());
        }

        let pdf_paths = list_pdf_files(&folder).await?;
        if pdf_paths.is_empty() {
            anyhow::bail!("No PDF files found in {}", folder.display());
        }

        let mut documents = Vec::with_capacity(pdf_paths.len());
        for path in pdf_paths {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload.pdf")
                .to_string();

            let bytes = tokio::fs::read(&path).await?;
            let (text, mut metadata) = self.parser.parse_document(&bytes, &filename).await?;
            metadata.insert("source".to_string(), serde_json::json!(filename.clone()));

            let chunks = chunk_text(&text, metadata, self.chunk_size, self.chunk_overlap);
            info!("Loaded {} into {} chunks", filename, chunks.len());
            documents.push(LoadedDocument { filename, chunks });
        }

        Ok(documents)
    }
}

/// Split text into `Chunk`s sharing the given metadata.
pub fn chunk_text(
    text: &str,
    metadata: HashMap<String, serde_json::Value>,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Chunk> {
    super::split_text(text, chunk_size, chunk_overlap)
        .into_iter()
        .map(|content| Chunk {
            content,
            metadata: metadata.clone(),
        })
        .collect()
}

async fn list_pdf_files(folder: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let mut entries = tokio::fs::read_dir(folder).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if path.is_file() && is_pdf {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
