use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::vector_store::chroma::ChromaStore;
use crate::vector_store::milvus::{MilvusFields, MilvusStore};
use crate::vector_store::pinecone::PineconeStore;
use crate::vector_store::weaviate::WeaviateStore;
use crate::vector_store::{BackendKind, VectorStore};

/// Instantiate the one adapter selected by configuration.
/// Unrecognized backend values fail here; there is no fallback.
pub fn create_vector_store(settings: &Settings) -> anyhow::Result<Arc<dyn VectorStore>> {
    let kind = BackendKind::from_str(&settings.vector_store_provider)?;
    info!("Selected vector store backend: {kind}");

    let store: Arc<dyn VectorStore> = match kind {
        BackendKind::Pinecone => Arc::new(PineconeStore::new(
            settings.pinecone_api_key.as_deref(),
            settings.pinecone_index_host.as_deref(),
            &settings.pinecone_namespace,
            &settings.pinecone_text_field,
            settings.backend_timeout_secs,
        )?),
        BackendKind::Milvus => Arc::new(MilvusStore::new(
            settings.milvus_url.as_deref(),
            settings.milvus_username.as_deref(),
            settings.milvus_password.as_deref(),
            settings.milvus_ssl,
            MilvusFields {
                collection_name: settings.milvus_collection_name.clone(),
                primary_field: settings.milvus_primary_field.clone(),
                vector_field: settings.milvus_vector_field.clone(),
                text_field: settings.milvus_text_field.clone(),
            },
            settings.backend_timeout_secs,
        )?),
        BackendKind::Weaviate => Arc::new(WeaviateStore::new(
            &settings.weaviate_scheme,
            &settings.weaviate_host,
            settings.weaviate_api_key.as_deref(),
            &settings.weaviate_index_name,
            &settings.weaviate_text_field,
            settings.backend_timeout_secs,
        )?),
        BackendKind::Chroma => Arc::new(ChromaStore::new(
            &settings.chroma_host,
            settings.chroma_port,
            &settings.chroma_collection_name,
            settings.backend_timeout_secs,
        )?),
    };

    Ok(store)
}
