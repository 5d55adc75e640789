use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::models::chunk::DocumentChunk;
use crate::vector_store::{validate_chunks, BackendKind, StoreOptions, VectorStore};

/// Pinecone adapter: index/namespace-style storage over the Pinecone HTTP API.
/// Credentials are required at construction; their absence is a configuration
/// error, not a first-request failure.
#[derive(Debug)]
pub struct PineconeStore {
    api_key: String,
    base_url: String,
    namespace: String,
    text_field: String,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct UpsertRequest {
    vectors: Vec<PineconeVector>,
    namespace: String,
}

#[derive(Serialize)]
struct PineconeVector {
    id: String,
    values: Vec<f32>,
    metadata: serde_json::Value,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    #[allow(dead_code)]
    id: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    metadata: serde_json::Value,
}

impl PineconeStore {
    pub fn new(
        api_key: Option<&str>,
        index_host: Option<&str>,
        namespace: &str,
        text_field: &str,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| anyhow::anyhow!("PINECONE_API_KEY is required for the pinecone backend"))?;
        let index_host = index_host
            .filter(|h| !h.is_empty())
            .ok_or_else(|| anyhow::anyhow!("PINECONE_INDEX_HOST is required for the pinecone backend"))?;

        // The dashboard reports the host without a scheme.
        let base_url = if index_host.starts_with("http") {
            index_host.trim_end_matches('/').to_string()
        } else {
            format!("https://{index_host}")
        };

        Ok(Self {
            api_key: api_key.to_string(),
            base_url,
            namespace: namespace.to_string(),
            text_field: text_field.to_string(),
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        })
    }

    fn resolve_namespace<'a>(&'a self, options: &'a StoreOptions) -> &'a str {
        options.namespace.as_deref().unwrap_or(&self.namespace)
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn store_embeddings(
        &self,
        chunks: &[DocumentChunk],
        options: &StoreOptions,
    ) -> anyhow::Result<Vec<String>> {
        validate_chunks(chunks, self.backend_kind())?;

        let text_field = options.text_field.as_deref().unwrap_or(&self.text_field);
        let namespace = self.resolve_namespace(options);

        let mut ids = Vec::with_capacity(chunks.len());
        let vectors: Vec<PineconeVector> = chunks
            .iter()
            .map(|chunk| {
                let id = format!("{}-{}", chunk.document_id, chunk.chunk_number);
                ids.push(id.clone());

                let mut metadata = serde_json::Map::new();
                metadata.insert(text_field.to_string(), json!(chunk.content));
                metadata.insert("document_id".to_string(), json!(chunk.document_id));
                metadata.insert("chunk_number".to_string(), json!(chunk.chunk_number));
                for (key, value) in &chunk.metadata {
                    metadata.entry(key.clone()).or_insert_with(|| value.clone());
                }

                PineconeVector {
                    id,
                    values: chunk.embedding.clone(),
                    metadata: serde_json::Value::Object(metadata),
                }
            })
            .collect();

        let request = UpsertRequest {
            vectors,
            namespace: namespace.to_string(),
        };

        let url = format!("{}/vectors/upsert", self.base_url);
        let resp = self
            .http_client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Pinecone upsert failed ({status}): {body}");
        }

        info!(
            "Upserted {} vectors into pinecone namespace {namespace}",
            ids.len()
        );
        Ok(ids)
    }

    async fn query_similar(
        &self,
        query_embedding: &[f32],
        k: usize,
        options: &StoreOptions,
    ) -> anyhow::Result<Vec<DocumentChunk>> {
        let text_field = options.text_field.as_deref().unwrap_or(&self.text_field);
        let namespace = self.resolve_namespace(options);

        let body = json!({
            "vector": query_embedding,
            "topK": k,
            "includeMetadata": true,
            "namespace": namespace,
        });

        let url = format!("{}/query", self.base_url);
        let resp = self
            .http_client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Pinecone query failed ({status}): {body}");
        }

        let response: QueryResponse = resp.json().await?;
        let chunks = response
            .matches
            .into_iter()
            .map(|m| {
                let content = m
                    .metadata
                    .get(text_field)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let document_id = m
                    .metadata
                    .get("document_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let chunk_number = m
                    .metadata
                    .get("chunk_number")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0) as i32;

                let metadata = match m.metadata {
                    serde_json::Value::Object(map) => map
                        .into_iter()
                        .filter(|(key, _)| {
                            key != text_field && key != "document_id" && key != "chunk_number"
                        })
                        .collect(),
                    _ => Default::default(),
                };

                DocumentChunk {
                    document_id,
                    content,
                    embedding: vec![],
                    chunk_number,
                    metadata,
                    score: m.score,
                }
            })
            .collect();

        Ok(chunks)
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Pinecone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_chunk() -> DocumentChunk {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), json!("report.pdf"));
        DocumentChunk {
            document_id: "doc1".to_string(),
            content: "The capital of France is Paris.".to_string(),
            embedding: vec![0.1, 0.2, 0.3],
            chunk_number: 0,
            metadata,
            score: 0.0,
        }
    }

    #[test]
    fn test_construction_requires_credentials() {
        assert!(PineconeStore::new(None, Some("host"), "ns", "text", 30).is_err());
        assert!(PineconeStore::new(Some("key"), None, "ns", "text", 30).is_err());
        assert!(PineconeStore::new(Some(""), Some("host"), "ns", "text", 30).is_err());
        assert!(PineconeStore::new(Some("key"), Some("host"), "ns", "text", 30).is_ok());
    }

    #[test]
    fn test_bare_host_gets_https_scheme() {
        let store =
            PineconeStore::new(Some("key"), Some("idx-abc.svc.pinecone.io"), "ns", "text", 30)
                .unwrap();
        assert_eq!(store.base_url, "https://idx-abc.svc.pinecone.io");
    }

    #[tokio::test]
    async fn test_upsert_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .and(header("Api-Key", "test-key"))
            .and(body_partial_json(json!({"namespace": "bot-test"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 1})))
            .mount(&server)
            .await;

        let store =
            PineconeStore::new(Some("test-key"), Some(server.uri().as_str()), "bot-test", "text", 30)
                .unwrap();
        let ids = store
            .store_embeddings(&[sample_chunk()], &StoreOptions::default())
            .await
            .unwrap();
        assert_eq!(ids, vec!["doc1-0"]);
    }

    #[tokio::test]
    async fn test_query_parses_matches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": [
                    {
                        "id": "doc1-0",
                        "score": 0.92,
                        "metadata": {
                            "text": "The capital of France is Paris.",
                            "document_id": "doc1",
                            "chunk_number": 0,
                            "source": "report.pdf"
                        }
                    }
                ]
            })))
            .mount(&server)
            .await;

        let store =
            PineconeStore::new(Some("test-key"), Some(server.uri().as_str()), "bot-test", "text", 30)
                .unwrap();
        let chunks = store
            .query_similar(&[0.1, 0.2, 0.3], 4, &StoreOptions::default())
            .await
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "The capital of France is Paris.");
        assert_eq!(chunks[0].document_id, "doc1");
        assert_eq!(chunks[0].score, 0.92);
        assert_eq!(chunks[0].metadata.get("source").unwrap(), "report.pdf");
        assert!(chunks[0].metadata.get("text").is_none());
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected_before_any_call() {
        let store =
            PineconeStore::new(Some("key"), Some("http://localhost:1"), "ns", "text", 30).unwrap();
        let err = store
            .store_embeddings(&[], &StoreOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty document batch"));
    }

    #[tokio::test]
    async fn test_upstream_error_is_tagged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let store =
            PineconeStore::new(Some("key"), Some(server.uri().as_str()), "ns", "text", 30).unwrap();
        let err = store
            .store_embeddings(&[sample_chunk()], &StoreOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Pinecone upsert failed"));
    }
}
