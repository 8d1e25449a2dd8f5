//! Wireframe Studio server entry point

use std::net::SocketAddr;
use std::sync::Arc;

use wireframe_config::{load_settings, Settings};
use wireframe_llm::{BackendConfig, GeneratorConfig, LlmBackend, OllamaBackend, WireframeGenerator};
use wireframe_server::{create_router, init_metrics, AppState};
use wireframe_session::{Janitor, SessionManager};
use wireframe_store::MemoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("WIREFRAME_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing not yet initialized, use eprintln for early logging
            eprintln!("Warning: failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&config);

    tracing::info!("Starting Wireframe Studio v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_env = env.as_deref().unwrap_or("default"),
        "configuration loaded"
    );

    let metrics_handle = init_metrics()?;
    tracing::info!("initialized Prometheus metrics at /metrics");

    let store = Arc::new(MemoryStore::new(config.engine.session_ttl()));

    let backend = OllamaBackend::new(BackendConfig {
        model: config.llm.model.clone(),
        endpoint: config.llm.endpoint.clone(),
        api_key: config.llm.api_key.clone(),
        max_tokens: config.llm.max_tokens,
        temperature: config.llm.temperature,
        timeout: config.llm.timeout() * (config.llm.max_retries + 1),
    })?;
    if !backend.is_available().await {
        tracing::warn!(
            endpoint = %config.llm.endpoint,
            "model backend not reachable at startup; requests will retry"
        );
    }
    let generator = Arc::new(WireframeGenerator::new(
        Arc::new(backend),
        GeneratorConfig {
            timeout: config.llm.timeout(),
            max_retries: config.llm.max_retries,
            backoff_base: config.llm.backoff_base(),
            jitter: 0.2,
        },
    ));

    let engine = Arc::new(SessionManager::new(
        store,
        generator,
        config.engine.clone(),
    ));

    let janitor = Janitor::new(engine.clone(), config.engine.janitor_interval());
    let janitor_shutdown = janitor.start();
    tracing::info!(
        interval_ms = config.engine.janitor_interval_ms,
        "janitor started"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let router = create_router(AppState::new(config, engine, metrics_handle));

    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = janitor_shutdown.send(true);
    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(config: &Settings) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if config.environment.is_production() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to listen for shutdown signal");
    }
}
