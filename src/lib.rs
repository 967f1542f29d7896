pub mod api; // HTTP router, endpoints, server lifecycle
pub mod config;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

use crate::api::{start_server, ApiContext};
use crate::config::ServiceConfig;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Serve until Ctrl-C, then drain in-flight requests and return.
pub async fn run(config: ServiceConfig) -> Result<(), String> {
    tracing::info!(
        version = config::APP_VERSION,
        backend = ?config.backend,
        model = %config.model,
        "{} starting",
        config::APP_NAME
    );
    if matches!(config.backend, config::LlmBackend::Gemini)
        && config.gemini_auth == pipeline::quote::GeminiAuth::None
    {
        tracing::warn!("No GEMINI_API_KEY or QUOTESHEET_BEARER_TOKEN set; Gemini calls will be rejected");
    }

    let bind_addr = config.bind_addr;
    let server = start_server(ApiContext::new(config), bind_addr).await?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for shutdown signal: {e}"))?;

    tracing::info!("Shutdown requested");
    server.stop().await;
    Ok(())
}
