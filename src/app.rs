use std::sync::Arc;

use crate::completion::CompletionModel;
use crate::config::Settings;
use crate::embedding::EmbeddingModel;
use crate::parser::loader::DirectoryLoader;
use crate::vector_store::VectorStore;

/// Shared application state passed to all route handlers.
pub struct AppState {
    pub settings: Settings,
    pub vector_store: Arc<dyn VectorStore>,
    pub embedding_model: Arc<dyn EmbeddingModel>,
    pub completion_model: Arc<dyn CompletionModel>,
    pub loader: DirectoryLoader,
}
