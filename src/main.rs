use std::net::SocketAddr;
use std::sync::Arc;

use explain_it::config::AppConfig;
use explain_it::llm::openrouter::OpenRouterClient;
use explain_it::routes;
use explain_it::settings::{FileBackend, SettingsStore};
use explain_it::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();

    let llm = OpenRouterClient::new(&config.llm).expect("failed to build HTTP client");
    tracing::info!(base_url = %config.llm.base_url, "LLM client initialized");

    let settings = SettingsStore::new(Arc::new(FileBackend::new(config.settings_path.clone())));
    match settings.get().await {
        Ok(current) => tracing::info!(
            path = %config.settings_path.display(),
            has_api_key = current.has_api_key(),
            model = %current.model,
            "settings loaded"
        ),
        Err(e) => tracing::warn!(path = %config.settings_path.display(), error = %e, "settings unreadable, defaults in use"),
    }

    let state = AppState::from_config(&config, settings, Arc::new(llm));
    let app = routes::app(state);

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind");

    if config.allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOW_ORIGIN unset; browser pages cannot reach the service");
    }
    tracing::info!(%addr, origins = ?config.allowed_origins, "explain-it listening");
    axum::serve(listener, app).await.expect("server failed");
}
