use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::models::chunk::DocumentChunk;
use crate::vector_store::{validate_chunks, BackendKind, StoreOptions, VectorStore};

/// Field-name defaults resolved at construction; any of them can be
/// overridden per call through `StoreOptions`.
#[derive(Debug, Clone)]
pub struct MilvusFields {
    pub collection_name: String,
    pub primary_field: String,
    pub vector_field: String,
    pub text_field: String,
}

/// Milvus adapter: collection-style storage over the Milvus RESTful API.
#[derive(Debug)]
pub struct MilvusStore {
    base_url: String,
    auth_token: Option<String>,
    defaults: MilvusFields,
    http_client: reqwest::Client,
}

impl MilvusStore {
    pub fn new(
        url: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
        ssl: bool,
        defaults: MilvusFields,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let url = url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| anyhow::anyhow!("MILVUS_URL is required for the milvus backend"))?;

        let base_url = if url.starts_with("http") {
            url.trim_end_matches('/').to_string()
        } else {
            let scheme = if ssl { "https" } else { "http" };
            format!("{scheme}://{url}")
        };

        let auth_token = match (username, password) {
            (Some(user), Some(pass)) if !user.is_empty() => Some(format!("{user}:{pass}")),
            _ => None,
        };

        Ok(Self {
            base_url,
            auth_token,
            defaults,
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        })
    }

    /// Merge call-time options over the construction-time defaults.
    fn resolve_fields(&self, options: &StoreOptions) -> MilvusFields {
        MilvusFields {
            collection_name: options
                .index_name
                .clone()
                .unwrap_or_else(|| self.defaults.collection_name.clone()),
            primary_field: options
                .primary_field
                .clone()
                .unwrap_or_else(|| self.defaults.primary_field.clone()),
            vector_field: options
                .vector_field
                .clone()
                .unwrap_or_else(|| self.defaults.vector_field.clone()),
            text_field: options
                .text_field
                .clone()
                .unwrap_or_else(|| self.defaults.text_field.clone()),
        }
    }

    async fn post_json(
        &self,
        route: &str,
        body: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        let url = format!("{}{route}", self.base_url);
        let mut request = self.http_client.post(&url).json(&body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Milvus request to {route} failed ({status}): {body}");
        }

        let value: serde_json::Value = resp.json().await?;
        // The RESTful API reports errors inside a 200 envelope.
        let code = value.get("code").and_then(|c| c.as_i64()).unwrap_or(200);
        if code != 200 {
            let message = value
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            anyhow::bail!("Milvus request to {route} failed (code {code}): {message}");
        }
        Ok(value)
    }
}

#[async_trait]
impl VectorStore for MilvusStore {
    async fn store_embeddings(
        &self,
        chunks: &[DocumentChunk],
        options: &StoreOptions,
    ) -> anyhow::Result<Vec<String>> {
        validate_chunks(chunks, self.backend_kind())?;
        let fields = self.resolve_fields(options);

        let mut ids = Vec::with_capacity(chunks.len());
        let rows: Vec<serde_json::Value> = chunks
            .iter()
            .map(|chunk| {
                let id = format!("{}-{}", chunk.document_id, chunk.chunk_number);
                ids.push(id.clone());
                let mut row = serde_json::Map::new();
                row.insert(fields.primary_field.clone(), json!(id));
                row.insert(fields.vector_field.clone(), json!(chunk.embedding));
                row.insert(fields.text_field.clone(), json!(chunk.content));
                row.insert("document_id".to_string(), json!(chunk.document_id));
                row.insert("chunk_number".to_string(), json!(chunk.chunk_number));
                serde_json::Value::Object(row)
            })
            .collect();

        let body = json!({
            "collectionName": fields.collection_name.clone(),
            "data": rows,
        });

        self.post_json("/v1/vector/insert", body).await?;
        info!(
            "Inserted {} rows into milvus collection {}",
            ids.len(),
            fields.collection_name
        );
        Ok(ids)
    }

    async fn query_similar(
        &self,
        query_embedding: &[f32],
        k: usize,
        options: &StoreOptions,
    ) -> anyhow::Result<Vec<DocumentChunk>> {
        let fields = self.resolve_fields(options);

        let body = json!({
            "collectionName": fields.collection_name,
            "vector": query_embedding,
            "limit": k,
            "outputFields": [fields.text_field.clone(), "document_id", "chunk_number"],
        });

        let value = self.post_json("/v1/vector/search", body).await?;
        let rows = value
            .get("data")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default();

        let chunks = rows
            .into_iter()
            .map(|row| {
                let distance = row.get("distance").and_then(|d| d.as_f64()).unwrap_or(0.0);
                DocumentChunk {
                    document_id: row
                        .get("document_id")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    content: row
                        .get(fields.text_field.as_str())
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    embedding: vec![],
                    chunk_number: row
                        .get("chunk_number")
                        .and_then(|v| v.as_i64())
                        .unwrap_or(0) as i32,
                    metadata: Default::default(),
                    score: distance,
                }
            })
            .collect();

        Ok(chunks)
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Milvus
    }
}
