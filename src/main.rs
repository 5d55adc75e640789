use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ragbridge::app::AppState;
use ragbridge::completion::azure_openai::AzureOpenAICompletionModel;
use ragbridge::config::load_settings_from_path;
use ragbridge::embedding::azure_openai::AzureOpenAIEmbeddingModel;
use ragbridge::parser::api::ApiParser;
use ragbridge::parser::loader::DirectoryLoader;
use ragbridge::routes;
use ragbridge::vector_store::factory::create_vector_store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting ragbridge server...");

    // Load configuration.
    let settings = load_settings_from_path("ragbridge.toml")?;
    info!(
        "Configuration loaded: host={}, port={}, backend={}",
        settings.host, settings.port, settings.vector_store_provider
    );

    // Select exactly one vector store backend.
    let vector_store = create_vector_store(&settings)?;
    info!("Vector store initialized: {}", vector_store.backend_kind());

    // Initialize embedding model.
    let embedding_model = Arc::new(AzureOpenAIEmbeddingModel::new(
        &settings.azure_instance_name,
        &settings.embedding_deployment,
        &settings.embedding_api_version,
        &settings.azure_api_key,
        settings.vector_dimensions,
        settings.embedding_timeout_secs,
    ));
    info!(
        "Embedding model initialized: {}",
        settings.embedding_deployment
    );

    // Initialize completion model.
    let completion_model = Arc::new(AzureOpenAICompletionModel::new(
        &settings.azure_instance_name,
        &settings.completion_deployment,
        &settings.completion_api_version,
        &settings.azure_api_key,
        settings.default_max_tokens,
        settings.default_temperature,
        settings.completion_timeout_secs,
    ));
    info!(
        "Completion model initialized: {}",
        settings.completion_deployment
    );

    // Initialize PDF loading.
    let parser = ApiParser::new(&settings.parse_api_url, settings.parser_timeout_secs);
    let loader = DirectoryLoader::new(
        &settings.shared_data_root,
        parser,
        settings.chunk_size,
        settings.chunk_overlap,
    );
    info!("Document loader initialized: root={}", settings.shared_data_root);

    // Build application state.
    let state = Arc::new(AppState {
        settings: settings.clone(),
        vector_store,
        embedding_model,
        completion_model,
        loader,
    });

    // Build router.
    let app = routes::build_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server.
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
