use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use hotel_rag::core::config::ConfigService;
use hotel_rag::core::errors::ConfigError;
use hotel_rag::logging;
use hotel_rag::rag::CouchbaseVectorStore;
use hotel_rag::server;
use hotel_rag::state::AppState;

const PING_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ConfigService::from_env().and_then(|service| service.load()) {
        Ok(config) => config,
        Err(err) => {
            report_config_error(&err);
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.server.log_dir);
    tracing::info!(
        "Configuration loaded: bucket={}, scope={}, collection={}, index={}, chat_model={}, embedding_model={}",
        config.couchbase.bucket,
        config.couchbase.scope,
        config.couchbase.collection,
        config.couchbase.search_index,
        config.openai.chat_model,
        config.openai.embedding_model
    );

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("hotel-rag: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn report_config_error(err: &ConfigError) {
    eprintln!("hotel-rag: {}", err);
    for key in err.missing_keys() {
        eprintln!("  missing: {}", key);
    }
}

async fn serve(config: hotel_rag::AppConfig) -> anyhow::Result<()> {
    let store = CouchbaseVectorStore::new(&config.couchbase, config.rag.search_timeout)
        .context("Failed to create Couchbase search client")?;
    match store.ping(PING_TIMEOUT).await {
        Ok(()) => tracing::info!("Search service reachable at {}", store.search_endpoint()),
        Err(e) => tracing::warn!(
            "Search service at {} did not answer ping: {}",
            store.search_endpoint(),
            e
        ),
    }

    let state = AppState::initialize(&config).context("Failed to build answer pipeline")?;

    let listener = TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        return std::future::pending().await;
    }
    tracing::info!("Shutting down");
}
