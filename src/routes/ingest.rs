use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{error, info};

use crate::app::AppState;
use crate::models::api::{ErrorResponse, IngestRequest, IngestResponse};
use crate::models::chunk::DocumentChunk;
use crate::routes::{bad_request, internal_error};
use crate::vector_store::StoreOptions;

/// Document ingestion routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/ingest", post(ingest_folder))
}

/// POST /api/ingest - Load PDFs from a shared folder, embed, and store.
/// The first failing stage aborts the whole request.
async fn ingest_folder(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, (StatusCode, Json<ErrorResponse>)> {
    if req.shared_folder.trim().is_empty() {
        return Err(bad_request("shared_folder is required"));
    }

    // 1. Load and chunk every PDF in the folder.
    let documents = state
        .loader
        .load_folder(&req.shared_folder)
        .await
        .map_err(|e| {
            error!("Document loading error: {e}");
            internal_error(format!("Document loading error: {e}"))
        })?;

    let document_count = documents.len();
    let mut doc_chunks: Vec<DocumentChunk> = Vec::new();

    for document in documents {
        let document_id = uuid::Uuid::new_v4().to_string();

        // 2. Embed the document's chunks.
        let texts: Vec<String> = document.chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = state
            .embedding_model
            .embed_for_ingestion(&texts)
            .await
            .map_err(|e| {
                error!("Embedding error for {}: {e}", document.filename);
                internal_error(format!("Embedding error: {e}"))
            })?;

        doc_chunks.extend(
            document
                .chunks
                .into_iter()
                .zip(embeddings)
                .enumerate()
                .map(|(i, (chunk, embedding))| {
                    chunk.into_document_chunk(document_id.clone(), i as i32, embedding)
                }),
        );
    }

    // 3. Store everything in the active backend.
    let chunk_count = doc_chunks.len();
    let options = StoreOptions::with_namespace(req.namespace.clone());
    state
        .vector_store
        .store_embeddings(&doc_chunks, &options)
        .await
        .map_err(|e| {
            error!("Vector store error: {e}");
            internal_error(format!("Storage error: {e}"))
        })?;

    info!(
        "Ingested {document_count} documents ({chunk_count} chunks) from {}",
        req.shared_folder
    );

    Ok(Json(IngestResponse {
        message: "Success".to_string(),
        document_count,
        chunk_count,
    }))
}
