pub mod chroma;
pub mod factory;
pub mod milvus;
pub mod pinecone;
pub mod weaviate;

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

use crate::models::chunk::DocumentChunk;

/// The vector database backend selected for this process.
/// Exactly one kind is active; the factory rejects anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Pinecone,
    Milvus,
    Weaviate,
    Chroma,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PINECONE" => Ok(Self::Pinecone),
            "MILVUS" => Ok(Self::Milvus),
            "WEAVIATE" => Ok(Self::Weaviate),
            "CHROMA" => Ok(Self::Chroma),
            other => anyhow::bail!("Unsupported vector store backend: {other}"),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pinecone => "pinecone",
            Self::Milvus => "milvus",
            Self::Weaviate => "weaviate",
            Self::Chroma => "chroma",
        };
        f.write_str(name)
    }
}

/// Per-call overrides. Adapters merge these over their construction-time
/// defaults; `None` means "use the default".
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Index, collection, or class name depending on the backend.
    pub index_name: Option<String>,
    /// Logical partition for namespace-style backends.
    pub namespace: Option<String>,
    pub primary_field: Option<String>,
    pub vector_field: Option<String>,
    pub text_field: Option<String>,
}

impl StoreOptions {
    pub fn with_namespace(namespace: Option<String>) -> Self {
        Self {
            namespace,
            ..Default::default()
        }
    }
}

/// Abstract vector store interface: document storage plus similarity search.
#[async_trait]
pub trait VectorStore: Send + Sync + fmt::Debug {
    /// Store document chunks with their embeddings. Returns the stored ids.
    async fn store_embeddings(
        &self,
        chunks: &[DocumentChunk],
        options: &StoreOptions,
    ) -> anyhow::Result<Vec<String>>;

    /// Find the `k` most similar chunks by embedding.
    async fn query_similar(
        &self,
        query_embedding: &[f32],
        k: usize,
        options: &StoreOptions,
    ) -> anyhow::Result<Vec<DocumentChunk>>;

    /// Which backend this adapter talks to; used to tag upstream errors.
    fn backend_kind(&self) -> BackendKind;
}

/// Shared input guard: an empty batch or a chunk with empty content is an
/// error, never a silent no-op.
pub(crate) fn validate_chunks(chunks: &[DocumentChunk], kind: BackendKind) -> anyhow::Result<()> {
    if chunks.is_empty() {
        anyhow::bail!("Cannot store an empty document batch in {kind}");
    }
    for chunk in chunks {
        if chunk.content.trim().is_empty() {
            anyhow::bail!(
                "Document {} chunk {} has empty content",
                chunk.document_id,
                chunk.chunk_number
            );
        }
        if chunk.embedding.is_empty() {
            anyhow::bail!(
                "Document {} chunk {} has no embedding",
                chunk.document_id,
                chunk.chunk_number
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn chunk(content: &str, embedding: Vec<f32>) -> DocumentChunk {
        DocumentChunk {
            document_id: "doc1".to_string(),
            content: content.to_string(),
            embedding,
            chunk_number: 0,
            metadata: HashMap::new(),
            score: 0.0,
        }
    }

    #[test]
    fn test_backend_kind_parse_case_insensitive() {
        assert_eq!(
            BackendKind::from_str("pinecone").unwrap(),
            BackendKind::Pinecone
        );
        assert_eq!(
            BackendKind::from_str("MILVUS").unwrap(),
            BackendKind::Milvus
        );
        assert_eq!(
            BackendKind::from_str("Weaviate").unwrap(),
            BackendKind::Weaviate
        );
        assert_eq!(
            BackendKind::from_str("chroma").unwrap(),
            BackendKind::Chroma
        );
    }

    #[test]
    fn test_backend_kind_rejects_unknown() {
        let err = BackendKind::from_str("qdrant").unwrap_err();
        assert!(err.to_string().contains("Unsupported vector store backend"));
    }

    #[test]
    fn test_validate_rejects_empty_batch() {
        let err = validate_chunks(&[], BackendKind::Pinecone).unwrap_err();
        assert!(err.to_string().contains("empty document batch"));
    }

    #[test]
    fn test_validate_rejects_empty_content() {
        let chunks = vec![chunk("  ", vec![0.1])];
        assert!(validate_chunks(&chunks, BackendKind::Milvus).is_err());
    }

    #[test]
    fn test_validate_rejects_missing_embedding() {
        let chunks = vec![chunk("text", vec![])];
        assert!(validate_chunks(&chunks, BackendKind::Chroma).is_err());
    }

    #[test]
    fn test_validate_accepts_good_batch() {
        let chunks = vec![chunk("text", vec![0.1, 0.2])];
        assert!(validate_chunks(&chunks, BackendKind::Weaviate).is_ok());
    }
}
