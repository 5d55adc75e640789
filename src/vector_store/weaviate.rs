use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::models::chunk::DocumentChunk;
use crate::vector_store::{validate_chunks, BackendKind, StoreOptions, VectorStore};

/// Weaviate adapter: class-based storage over the Weaviate REST + GraphQL API.
#[derive(Debug)]
pub struct WeaviateStore {
    base_url: String,
    api_key: Option<String>,
    class_name: String,
    text_field: String,
    http_client: reqwest::Client,
}

impl WeaviateStore {
    pub fn new(
        scheme: &str,
        host: &str,
        api_key: Option<&str>,
        class_name: &str,
        text_field: &str,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        if class_name.is_empty() {
            anyhow::bail!("WEAVIATE_INDEX_NAME (class name) is required for the weaviate backend");
        }

        Ok(Self {
            base_url: format!("{scheme}://{host}"),
            api_key: api_key.filter(|k| !k.is_empty()).map(|k| k.to_string()),
            class_name: class_name.to_string(),
            text_field: text_field.to_string(),
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn resolve_class<'a>(&'a self, options: &'a StoreOptions) -> &'a str {
        options.index_name.as_deref().unwrap_or(&self.class_name)
    }
}

#[async_trait]
impl VectorStore for WeaviateStore {
    async fn store_embeddings(
        &self,
        chunks: &[DocumentChunk],
        options: &StoreOptions,
    ) -> anyhow::Result<Vec<String>> {
        validate_chunks(chunks, self.backend_kind())?;

        let class = self.resolve_class(options);
        let text_field = options.text_field.as_deref().unwrap_or(&self.text_field);

        let mut ids = Vec::with_capacity(chunks.len());
        let objects: Vec<serde_json::Value> = chunks
            .iter()
            .map(|chunk| {
                let id = uuid::Uuid::new_v4().to_string();
                ids.push(id.clone());

                let mut properties = serde_json::Map::new();
                properties.insert(text_field.to_string(), json!(chunk.content));
                properties.insert("document_id".to_string(), json!(chunk.document_id));
                properties.insert("chunk_number".to_string(), json!(chunk.chunk_number));
                if let Some(source) = chunk.metadata.get("source") {
                    properties.insert("source".to_string(), source.clone());
                }

                json!({
                    "id": id,
                    "class": class,
                    "properties": properties,
                    "vector": chunk.embedding,
                })
            })
            .collect();

        let url = format!("{}/v1/batch/objects", self.base_url);
        let resp = self
            .authorized(self.http_client.post(&url))
            .json(&json!({"objects": objects}))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Weaviate batch insert failed ({status}): {body}");
        }

        info!(
            "Stored {} objects in weaviate class {class}",
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
        let class = self.resolve_class(options);
        let text_field = options.text_field.as_deref().unwrap_or(&self.text_field);

        let vector_json = serde_json::to_string(query_embedding)?;
        let graphql = format!(
            "{{ Get {{ {class}(nearVector: {{vector: {vector_json}}}, limit: {k}) \
             {{ {text_field} document_id chunk_number _additional {{ certainty }} }} }} }}"
        );

        let url = format!("{}/v1/graphql", self.base_url);
        let resp = self
            .authorized(self.http_client.post(&url))
            .json(&json!({"query": graphql}))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Weaviate query failed ({status}): {body}");
        }

        let value: serde_json::Value = resp.json().await?;
        if let Some(errors) = value.get("errors") {
            anyhow::bail!("Weaviate query failed: {errors}");
        }

        let rows = value
            .pointer(&format!("/data/Get/{class}"))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let chunks = rows
            .into_iter()
            .map(|row| {
                let certainty = row
                    .pointer("/_additional/certainty")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.0);
                DocumentChunk {
                    document_id: row
                        .get("document_id")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    content: row
                        .get(text_field)
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    embedding: vec![],
                    chunk_number: row
                        .get("chunk_number")
                        .and_then(|v| v.as_i64())
                        .unwrap_or(0) as i32,
                    metadata: Default::default(),
                    score: certainty,
                }
            })
            .collect();

        Ok(chunks)
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Weaviate
    }
}
