mod analyzer;
mod config;
mod drafts;
mod error;
mod gemini;
mod models;
mod orchestrator;
mod routes;
mod store;
mod timeline;

use std::{net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    config::AppConfig,
    drafts::TaskTemplateGenerator,
    gemini::GeminiClient,
    orchestrator::TaskGenerationService,
    routes::{api_router, AppState},
    store::{InMemoryStore, Store},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env();
    if config.is_demo() {
        tracing::warn!("GEMINI_API_KEY not set; AI generation will always use template tasks");
    } else {
        tracing::info!("Using API key: {}", config.masked_api_key());
    }

    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let generator = TaskTemplateGenerator::new(
        Arc::new(GeminiClient::from_config(&config)),
        config.gemini_model.clone(),
        config.generation_timeout,
    );
    let state = AppState {
        store: store.clone(),
        generator: Arc::new(TaskGenerationService::new(generator, store)),
    };

    let app = api_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, model = %config.gemini_model, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
