use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::info;

use crate::models::chunk::DocumentChunk;
use crate::vector_store::{validate_chunks, BackendKind, StoreOptions, VectorStore};

/// Chroma adapter: collection-style storage over the Chroma HTTP API.
/// Collection ids are resolved lazily via get-or-create and cached per name.
#[derive(Debug)]
pub struct ChromaStore {
    base_url: String,
    collection_name: String,
    collection_ids: Mutex<HashMap<String, String>>,
    http_client: reqwest::Client,
}

impl ChromaStore {
    pub fn new(
        host: &str,
        port: u16,
        collection_name: &str,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        if collection_name.is_empty() {
            anyhow::bail!("Collection name is required for the chroma backend");
        }

        let base_url = if host.starts_with("http") {
            format!("{}:{port}/api/v1", host.trim_end_matches('/'))
        } else {
            format!("http://{host}:{port}/api/v1")
        };

        Ok(Self {
            base_url,
            collection_name: collection_name.to_string(),
            collection_ids: Mutex::new(HashMap::new()),
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        })
    }

    /// Resolve the collection id, creating the collection on first use.
    async fn collection_id(&self, name: &str) -> anyhow::Result<String> {
        let mut cache = self.collection_ids.lock().await;
        if let Some(id) = cache.get(name) {
            return Ok(id.clone());
        }

        let url = format!("{}/collections", self.base_url);
        let resp = self
            .http_client
            .post(&url)
            .json(&json!({"name": name, "get_or_create": true}))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Chroma get_or_create collection failed ({status}): {body}");
        }

        let value: serde_json::Value = resp.json().await?;
        let id = value
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Chroma returned no collection id for {name}"))?
            .to_string();

        cache.insert(name.to_string(), id.clone());
        Ok(id)
    }

    fn resolve_collection<'a>(&'a self, options: &'a StoreOptions) -> &'a str {
        options
            .index_name
            .as_deref()
            .unwrap_or(&self.collection_name)
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn store_embeddings(
        &self,
        chunks: &[DocumentChunk],
        options: &StoreOptions,
    ) -> anyhow::Result<Vec<String>> {
        validate_chunks(chunks, self.backend_kind())?;

        let name = self.resolve_collection(options);
        let collection_id = self.collection_id(name).await?;

        let mut ids = Vec::with_capacity(chunks.len());
        let mut embeddings = Vec::with_capacity(chunks.len());
        let mut documents = Vec::with_capacity(chunks.len());
        let mut metadatas = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            ids.push(format!("{}-{}", chunk.document_id, chunk.chunk_number));
            embeddings.push(chunk.embedding.clone());
            documents.push(chunk.content.clone());

            let mut metadata = chunk.metadata.clone();
            metadata.insert("document_id".to_string(), json!(chunk.document_id));
            metadata.insert("chunk_number".to_string(), json!(chunk.chunk_number));
            metadatas.push(metadata);
        }

        let url = format!("{}/collections/{collection_id}/add", self.base_url);
        let resp = self
            .http_client
            .post(&url)
            .json(&json!({
                "ids": ids,
                "embeddings": embeddings,
                "documents": documents,
                "metadatas": metadatas,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Chroma add failed ({status}): {body}");
        }

        info!("Added {} embeddings to chroma collection {name}", ids.len());
        Ok(ids)
    }

    async fn query_similar(
        &self,
        query_embedding: &[f32],
        k: usize,
        options: &StoreOptions,
    ) -> anyhow::Result<Vec<DocumentChunk>> {
        let name = self.resolve_collection(options);
        let collection_id = self.collection_id(name).await?;

        let url = format!("{}/collections/{collection_id}/query", self.base_url);
        let resp = self
            .http_client
            .post(&url)
            .json(&json!({
                "query_embeddings": [query_embedding],
                "n_results": k,
                "include": ["documents", "metadatas", "distances"],
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Chroma query failed ({status}): {body}");
        }

        let value: serde_json::Value = resp.json().await?;
        let documents = first_batch(&value, "documents");
        let metadatas = first_batch(&value, "metadatas");
        let distances = first_batch(&value, "distances");

        let mut chunks = Vec::with_capacity(documents.len());
        for (i, doc) in documents.iter().enumerate() {
            let content = doc.as_str().unwrap_or("").to_string();
            let metadata_value = metadatas.get(i).cloned().unwrap_or(json!({}));
            let distance = distances.get(i).and_then(|d| d.as_f64()).unwrap_or(0.0);

            let document_id = metadata_value
                .get("document_id")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let chunk_number = metadata_value
                .get("chunk_number")
                .and_then(|v| v.as_i64())
                .unwrap_or(0) as i32;

            let metadata = match metadata_value {
                serde_json::Value::Object(map) => map
                    .into_iter()
                    .filter(|(key, _)| key != "document_id" && key != "chunk_number")
                    .collect(),
                _ => Default::default(),
            };

            chunks.push(DocumentChunk {
                document_id,
                content,
                embedding: vec![],
                chunk_number,
                metadata,
                score: 1.0 - distance,
            });
        }

        Ok(chunks)
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Chroma
    }
}

/// Chroma nests results per query vector; we only ever send one.
fn first_batch(value: &serde_json::Value, field: &str) -> Vec<serde_json::Value> {
    value
        .get(field)
        .and_then(|v| v.get(0))
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_chunk() -> DocumentChunk {
        DocumentChunk {
            document_id: "doc1".to_string(),
            content: "Chroma keeps collections of embeddings.".to_string(),
            embedding: vec![0.9, 1.0],
            chunk_number: 3,
            metadata: HashMap::new(),
            score: 0.0,
        }
    }

    async fn mount_collection(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/v1/collections"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "col-123", "name": "documents"})),
            )
            .mount(server)
            .await;
    }

    #[test]
    fn test_construction_requires_collection_name() {
        assert!(ChromaStore::new("localhost", 8000, "", 30).is_err());
        let store = ChromaStore::new("localhost", 8000, "documents", 30).unwrap();
        assert_eq!(store.base_url, "http://localhost:8000/api/v1");
    }

    #[tokio::test]
    async fn test_add_resolves_collection_once() {
        let server = MockServer::start().await;
        mount_collection(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/collections/col-123/add"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
            .expect(2)
            .mount(&server)
            .await;

        let uri = server.uri();
        let host = uri.trim_start_matches("http://");
        let (host, port) = host.split_once(':').unwrap();
        let store = ChromaStore::new(host, port.parse().unwrap(), "documents", 30).unwrap();

        let opts = StoreOptions::default();
        store.store_embeddings(&[sample_chunk()], &opts).await.unwrap();
        store.store_embeddings(&[sample_chunk()], &opts).await.unwrap();

        // One get_or_create despite two writes.
        let requests = server.received_requests().await.unwrap();
        let creates = requests
            .iter()
            .filter(|r| r.url.path() == "/api/v1/collections")
            .count();
        assert_eq!(creates, 1);
    }

    #[tokio::test]
    async fn test_query_parses_nested_results() {
        let server = MockServer::start().await;
        mount_collection(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/collections/col-123/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ids": [["doc1-3"]],
                "documents": [["Chroma keeps collections of embeddings."]],
                "metadatas": [[{"document_id": "doc1", "chunk_number": 3, "source": "a.pdf"}]],
                "distances": [[0.12]]
            })))
            .mount(&server)
            .await;

        let uri = server.uri();
        let host = uri.trim_start_matches("http://");
        let (host, port) = host.split_once(':').unwrap();
        let store = ChromaStore::new(host, port.parse().unwrap(), "documents", 30).unwrap();

        let chunks = store
            .query_similar(&[0.9, 1.0], 4, &StoreOptions::default())
            .await
            .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].document_id, "doc1");
        assert_eq!(chunks[0].chunk_number, 3);
        assert!((chunks[0].score - 0.88).abs() < 1e-9);
        assert_eq!(chunks[0].metadata.get("source").unwrap(), "a.pdf");
    }
}
