use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{error, info};

use crate::app::AppState;
use crate::chain::{sanitize_question, RetrievalChain};
use crate::models::api::{ChatRequest, ChatResponse, ErrorResponse, SourceDocument};
use crate::routes::{bad_request, internal_error};

/// Chat routes. Only POST is routed; axum answers anything else with 405.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/chat", post(chat))
}

/// POST /api/chat - Answer a question over the stored documents.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    if sanitize_question(&req.question).is_empty() {
        return Err(bad_request("No question in the request"));
    }

    if let Some(mode) = &req.mode {
        info!("Chat request (mode={mode})");
    }

    let chain = RetrievalChain::new(
        state.vector_store.clone(),
        state.embedding_model.clone(),
        state.completion_model.clone(),
        state.settings.top_k,
    );

    let result = chain
        .run(&req.question, &req.history, req.namespace.clone())
        .await
        .map_err(|e| {
            error!("Chat error: {e}");
            internal_error(e.to_string())
        })?;

    let source_documents = result
        .sources
        .into_iter()
        .map(|chunk| SourceDocument {
            page_content: chunk.content,
            metadata: chunk.metadata,
            score: chunk.score,
        })
        .collect();

    Ok(Json(ChatResponse {
        text: result.answer,
        source_documents,
    }))
}
