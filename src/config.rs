use serde::Deserialize;
use std::path::Path;

// ──────────────────────────── TOML structure ────────────────────────────

#[derive(Debug, Deserialize, Clone)]
pub struct TomlConfig {
    pub api: ApiConfig,
    pub embedding: EmbeddingConfig,
    pub completion: CompletionConfig,
    pub parser: ParserConfig,
    pub vector_store: VectorStoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub deployment: String,
    #[serde(default = "default_embedding_api_version")]
    pub api_version: String,
    pub dimensions: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_embedding_api_version() -> String {
    "2023-05-15".to_string()
}
fn default_request_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    pub deployment: String,
    #[serde(default = "default_completion_api_version")]
    pub api_version: String,
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_completion_api_version() -> String {
    "2024-02-01".to_string()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_temperature() -> f64 {
    0.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct ParserConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    pub parse_api_url: String,
    #[serde(default = "default_shared_data_root")]
    pub shared_data_root: String,
    #[serde(default = "default_parser_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_shared_data_root() -> String {
    "/app/shared_data".to_string()
}
fn default_parser_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreConfig {
    pub provider: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_backend_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub pinecone: Option<PineconeConfig>,
    #[serde(default)]
    pub milvus: Option<MilvusConfig>,
    #[serde(default)]
    pub weaviate: Option<WeaviateConfig>,
    #[serde(default)]
    pub chroma: Option<ChromaConfig>,
}

fn default_top_k() -> usize {
    4
}
fn default_backend_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PineconeConfig {
    #[serde(default)]
    pub index_name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_text_field")]
    pub text_field: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MilvusConfig {
    #[serde(default)]
    pub collection_name: String,
    #[serde(default = "default_primary_field")]
    pub primary_field: String,
    #[serde(default = "default_vector_field")]
    pub vector_field: String,
    #[serde(default = "default_text_field")]
    pub text_field: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WeaviateConfig {
    #[serde(default)]
    pub index_name: String,
    #[serde(default = "default_text_field")]
    pub text_field: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChromaConfig {
    #[serde(default)]
    pub collection_name: String,
}

fn default_namespace() -> String {
    "bot-test".to_string()
}
fn default_primary_field() -> String {
    "id".to_string()
}
fn default_vector_field() -> String {
    "vector".to_string()
}
fn default_text_field() -> String {
    "text".to_string()
}

// ──────────────────────────── Resolved Settings ────────────────────────────

/// Flat settings structure resolved from TOML + environment variables.
/// Built once at startup and shared immutably for the process lifetime.
#[derive(Debug, Clone)]
pub struct Settings {
    // API
    pub host: String,
    pub port: u16,

    // Azure OpenAI
    pub azure_api_key: String,
    pub azure_instance_name: String,
    pub embedding_deployment: String,
    pub embedding_api_version: String,
    pub vector_dimensions: u32,
    pub embedding_timeout_secs: u64,
    pub completion_deployment: String,
    pub completion_api_version: String,
    pub default_max_tokens: u32,
    pub default_temperature: f64,
    pub completion_timeout_secs: u64,

    // Parser
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub parse_api_url: String,
    pub shared_data_root: String,
    pub parser_timeout_secs: u64,

    // Vector store
    pub vector_store_provider: String,
    pub top_k: usize,
    pub backend_timeout_secs: u64,

    // Pinecone
    pub pinecone_api_key: Option<String>,
    pub pinecone_index_host: Option<String>,
    pub pinecone_index_name: String,
    pub pinecone_namespace: String,
    pub pinecone_text_field: String,

    // Milvus
    pub milvus_url: Option<String>,
    pub milvus_username: Option<String>,
    pub milvus_password: Option<String>,
    pub milvus_ssl: bool,
    pub milvus_collection_name: String,
    pub milvus_primary_field: String,
    pub milvus_vector_field: String,
    pub milvus_text_field: String,

    // Weaviate
    pub weaviate_scheme: String,
    pub weaviate_host: String,
    pub weaviate_api_key: Option<String>,
    pub weaviate_index_name: String,
    pub weaviate_text_field: String,

    // Chroma
    pub chroma_host: String,
    pub chroma_port: u16,
    pub chroma_collection_name: String,
}

/// Load settings from a TOML path plus the process environment.
pub fn load_settings_from_path(path: impl AsRef<Path>) -> anyhow::Result<Settings> {
    // Load .env if present (ignore errors).
    let _ = dotenvy::dotenv();

    let content = std::fs::read_to_string(path.as_ref())?;
    let config: TomlConfig = toml::from_str(&content)?;

    let azure_api_key = std::env::var("AZURE_OPENAI_API_KEY")
        .map_err(|_| anyhow::anyhow!("AZURE_OPENAI_API_KEY environment variable is required"))?;
    let azure_instance_name = std::env::var("AZURE_OPENAI_API_INSTANCE_NAME").map_err(|_| {
        anyhow::anyhow!("AZURE_OPENAI_API_INSTANCE_NAME environment variable is required")
    })?;

    // VECTOR_BACKEND overrides the TOML provider so deployments can switch
    // backends without editing the config file.
    let vector_store_provider =
        std::env::var("VECTOR_BACKEND").unwrap_or_else(|_| config.vector_store.provider.clone());

    let pinecone = config.vector_store.pinecone.clone().unwrap_or_default();
    let milvus = config.vector_store.milvus.clone().unwrap_or_default();
    let weaviate = config.vector_store.weaviate.clone().unwrap_or_default();
    let chroma = config.vector_store.chroma.clone().unwrap_or_default();

    let milvus_ssl = std::env::var("MILVUS_SSL")
        .map(|v| v == "true")
        .unwrap_or(false);

    let chroma_port = std::env::var("CHROMA_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);

    Ok(Settings {
        host: config.api.host,
        port: config.api.port,
        azure_api_key,
        azure_instance_name,
        embedding_deployment: config.embedding.deployment,
        embedding_api_version: config.embedding.api_version,
        vector_dimensions: config.embedding.dimensions,
        embedding_timeout_secs: config.embedding.request_timeout_secs,
        completion_deployment: config.completion.deployment,
        completion_api_version: config.completion.api_version,
        default_max_tokens: config.completion.default_max_tokens,
        default_temperature: config.completion.default_temperature,
        completion_timeout_secs: config.completion.request_timeout_secs,
        chunk_size: config.parser.chunk_size,
        chunk_overlap: config.parser.chunk_overlap,
        parse_api_url: config.parser.parse_api_url,
        shared_data_root: config.parser.shared_data_root,
        parser_timeout_secs: config.parser.request_timeout_secs,
        vector_store_provider,
        top_k: config.vector_store.top_k,
        backend_timeout_secs: config.vector_store.request_timeout_secs,
        pinecone_api_key: std::env::var("PINECONE_API_KEY").ok(),
        pinecone_index_host: std::env::var("PINECONE_INDEX_HOST").ok(),
        pinecone_index_name: pinecone.index_name,
        pinecone_namespace: pinecone.namespace,
        pinecone_text_field: pinecone.text_field,
        milvus_url: std::env::var("MILVUS_URL").ok(),
        milvus_username: std::env::var("MILVUS_USERNAME").ok(),
        milvus_password: std::env::var("MILVUS_PASSWORD").ok(),
        milvus_ssl,
        milvus_collection_name: milvus.collection_name,
        milvus_primary_field: milvus.primary_field,
        milvus_vector_field: milvus.vector_field,
        milvus_text_field: milvus.text_field,
        weaviate_scheme: std::env::var("WEAVIATE_SCHEME").unwrap_or_else(|_| "https".to_string()),
        weaviate_host: std::env::var("WEAVIATE_HOST").unwrap_or_else(|_| "localhost".to_string()),
        weaviate_api_key: std::env::var("WEAVIATE_API_KEY").ok(),
        weaviate_index_name: weaviate.index_name,
        weaviate_text_field: weaviate.text_field,
        chroma_host: std::env::var("CHROMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
        chroma_port,
        chroma_collection_name: chroma.collection_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal_toml() -> String {
        r#"
[api]
host = "0.0.0.0"
port = 3000

[embedding]
deployment = "text-embedding-ada-002"
dimensions = 1536

[completion]
deployment = "gpt-35-turbo"

[parser]
parse_api_url = "http://localhost:6000"

[vector_store]
provider = "pinecone"

[vector_store.pinecone]
index_name = "docs"
"#
        .to_string()
    }

    fn set_required_env() {
        unsafe {
            std::env::set_var("AZURE_OPENAI_API_KEY", "test-key");
            std::env::set_var("AZURE_OPENAI_API_INSTANCE_NAME", "test-instance");
        }
    }

    #[test]
    fn test_parse_minimal_toml() {
        set_required_env();
        unsafe { std::env::remove_var("VECTOR_BACKEND") };
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(minimal_toml().as_bytes()).unwrap();
        let settings = load_settings_from_path(tmp.path()).unwrap();

        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.embedding_deployment, "text-embedding-ada-002");
        assert_eq!(settings.vector_dimensions, 1536);
        assert_eq!(settings.chunk_size, 1000);
        assert_eq!(settings.chunk_overlap, 200);
        assert_eq!(settings.vector_store_provider, "pinecone");
        assert_eq!(settings.pinecone_index_name, "docs");
        assert_eq!(settings.pinecone_namespace, "bot-test");
        assert_eq!(settings.top_k, 4);
    }

    #[test]
    fn test_milvus_field_defaults() {
        set_required_env();
        unsafe { std::env::remove_var("VECTOR_BACKEND") };
        let toml_content = r#"
[api]
host = "0.0.0.0"
port = 3000

[embedding]
deployment = "text-embedding-ada-002"
dimensions = 1536

[completion]
deployment = "gpt-35-turbo"

[parser]
parse_api_url = "http://localhost:6000"
chunk_size = 500
chunk_overlap = 50

[vector_store]
provider = "milvus"
top_k = 8

[vector_store.milvus]
collection_name = "documents"
"#;
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(toml_content.as_bytes()).unwrap();
        let settings = load_settings_from_path(tmp.path()).unwrap();

        assert_eq!(settings.milvus_collection_name, "documents");
        assert_eq!(settings.milvus_primary_field, "id");
        assert_eq!(settings.milvus_vector_field, "vector");
        assert_eq!(settings.milvus_text_field, "text");
        assert_eq!(settings.chunk_size, 500);
        assert_eq!(settings.top_k, 8);
    }
}
