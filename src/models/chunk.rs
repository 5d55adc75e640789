use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A raw text chunk produced by parsing, before embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Chunk {
    /// Pair the chunk with its embedding for storage.
    pub fn into_document_chunk(
        self,
        document_id: String,
        chunk_number: i32,
        embedding: Vec<f32>,
    ) -> DocumentChunk {
        DocumentChunk {
            document_id,
            content: self.content,
            embedding,
            chunk_number,
            metadata: self.metadata,
            score: 0.0,
        }
    }
}

/// A chunk as stored in (or returned from) a vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Identifier of the parent document.
    pub document_id: String,
    pub content: String,
    /// Dense embedding vector (empty when returned from queries).
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub chunk_number: i32,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Similarity score (0 when not produced by a query).
    #[serde(default)]
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_document_chunk() {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), serde_json::json!("report.pdf"));
        let chunk = Chunk {
            content: "Hello world".to_string(),
            metadata,
        };
        let doc_chunk = chunk.into_document_chunk("doc1".to_string(), 2, vec![0.1, 0.2]);
        assert_eq!(doc_chunk.document_id, "doc1");
        assert_eq!(doc_chunk.chunk_number, 2);
        assert_eq!(doc_chunk.embedding, vec![0.1, 0.2]);
        assert_eq!(doc_chunk.metadata.get("source").unwrap(), "report.pdf");
        assert_eq!(doc_chunk.score, 0.0);
    }

    #[test]
    fn test_document_chunk_roundtrip() {
        let chunk = DocumentChunk {
            document_id: "doc1".to_string(),
            content: "test content".to_string(),
            embedding: vec![],
            chunk_number: 0,
            metadata: HashMap::new(),
            score: 0.87,
        };
        let json = serde_json::to_string(&chunk).unwrap();
        let back: DocumentChunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back.content, "test content");
        assert_eq!(back.score, 0.87);
    }
}
