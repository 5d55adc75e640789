use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ──────────────────────────── Ingest ────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    /// Folder under the shared data root containing PDFs to ingest.
    pub shared_folder: String,
    /// Namespace (or collection partition) to store vectors under.
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub message: String,
    pub document_count: usize,
    pub chunk_count: usize,
}

// ──────────────────────────── Chat ────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    /// Prior (question, answer) turns, oldest first.
    #[serde(default)]
    pub history: Vec<(String, String)>,
    #[serde(default)]
    pub namespace: Option<String>,
    /// Client hint, accepted for compatibility; does not switch models.
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SourceDocument {
    pub page_content: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
    pub source_documents: Vec<SourceDocument>,
}

// ──────────────────────────── Errors / Health ────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_defaults() {
        let req: ChatRequest = serde_json::from_str(r#"{"question": "What is X?"}"#).unwrap();
        assert_eq!(req.question, "What is X?");
        assert!(req.history.is_empty());
        assert!(req.namespace.is_none());
        assert!(req.mode.is_none());
    }

    #[test]
    fn test_chat_request_with_history_pairs() {
        let json = r#"{
            "question": "And its population?",
            "history": [["What is the capital of France?", "Paris."]],
            "namespace": "bot-test",
            "mode": "default"
        }"#;
        let req: ChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.history.len(), 1);
        assert_eq!(req.history[0].0, "What is the capital of France?");
        assert_eq!(req.history[0].1, "Paris.");
        assert_eq!(req.namespace.as_deref(), Some("bot-test"));
    }

    #[test]
    fn test_ingest_request() {
        let req: IngestRequest =
            serde_json::from_str(r#"{"shared_folder": "reports", "namespace": "ns1"}"#).unwrap();
        assert_eq!(req.shared_folder, "reports");
        assert_eq!(req.namespace.as_deref(), Some("ns1"));
    }
}
