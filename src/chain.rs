use std::sync::Arc;
use tracing::info;

use crate::completion::{CompletionModel, Message};
use crate::embedding::EmbeddingModel;
use crate::models::chunk::DocumentChunk;
use crate::vector_store::{StoreOptions, VectorStore};

const CONDENSE_PROMPT: &str = "Given the following conversation and a follow up \
question, rephrase the follow up question to be a standalone question.";

const QA_PROMPT: &str = "You are a helpful AI assistant. Use the following pieces \
of context to answer the question at the end. If you don't know the answer, just \
say you don't know. DO NOT try to make up an answer. If the question is not \
related to the context, politely respond that you are tuned to only answer \
questions that are related to the context.";

/// Outcome of one chain invocation: the answer plus the chunks it was
/// grounded on.
#[derive(Debug)]
pub struct ChainResult {
    pub answer: String,
    pub sources: Vec<DocumentChunk>,
}

/// Retrieval-augmented generation over the active vector store: condense the
/// question against history, retrieve top-K similar chunks, then answer from
/// the retrieved context.
pub struct RetrievalChain {
    vector_store: Arc<dyn VectorStore>,
    embedding_model: Arc<dyn EmbeddingModel>,
    completion_model: Arc<dyn CompletionModel>,
    top_k: usize,
}

impl RetrievalChain {
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        embedding_model: Arc<dyn EmbeddingModel>,
        completion_model: Arc<dyn CompletionModel>,
        top_k: usize,
    ) -> Self {
        Self {
            vector_store,
            embedding_model,
            completion_model,
            top_k,
        }
    }

    /// Run the chain for one question. Rejects empty questions before any
    /// external call.
    pub async fn run(
        &self,
        question: &str,
        history: &[(String, String)],
        namespace: Option<String>,
    ) -> anyhow::Result<ChainResult> {
        let question = sanitize_question(question);
        if question.is_empty() {
            anyhow::bail!("No question in the request");
        }

        let standalone = if history.is_empty() {
            question
        } else {
            self.condense_question(&question, history).await?
        };

        let query_embedding = self.embedding_model.embed_for_query(&standalone).await?;

        let options = StoreOptions::with_namespace(namespace);
        let sources = self
            .vector_store
            .query_similar(&query_embedding, self.top_k, &options)
            .await?;
        info!(
            "Retrieved {} chunks from {} for question",
            sources.len(),
            self.vector_store.backend_kind()
        );

        let messages = vec![
            Message::system(format!(
                "{QA_PROMPT}\n\nContext:\n{}",
                format_context(&sources)
            )),
            Message::user(standalone),
        ];

        let result = self.completion_model.complete(&messages, None, None).await?;

        Ok(ChainResult {
            answer: result.content,
            sources,
        })
    }

    /// Rewrite a follow-up question into a standalone one using the history.
    async fn condense_question(
        &self,
        question: &str,
        history: &[(String, String)],
    ) -> anyhow::Result<String> {
        let transcript = history
            .iter()
            .map(|(q, a)| format!("Human: {q}\nAssistant: {a}"))
            .collect::<Vec<_>>()
            .join("\n");

        let messages = vec![
            Message::system(CONDENSE_PROMPT),
            Message::user(format!(
                "Chat history:\n{transcript}\n\nFollow up question: {question}\n\nStandalone question:"
            )),
        ];

        let result = self.completion_model.complete(&messages, None, None).await?;
        let condensed = result.content.trim().to_string();
        if condensed.is_empty() {
            // Fall back to the original question rather than searching nothing.
            return Ok(question.to_string());
        }
        Ok(condensed)
    }
}

/// Trim the question and collapse embedded newlines to spaces; embedding
/// models behave better on single-line input.
pub fn sanitize_question(question: &str) -> String {
    question.trim().replace('\n', " ")
}

/// Render retrieved chunks as a context block for the QA prompt.
fn format_context(chunks: &[DocumentChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
