use std::sync::Arc;

use backoffice_api::app::{router, AppState};
use backoffice_api::config::AppConfig;
use backoffice_api::database::DatabaseManager;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("backoffice_api=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!("Starting Backoffice API in {:?} mode", config.environment);
    if config.security.jwt_secret.is_empty() {
        if config.is_production() {
            anyhow::bail!("JWT_SECRET must be set in production");
        }
        tracing::warn!("JWT_SECRET is not set; every protected request will be rejected");
    }

    let databases = Arc::new(
        DatabaseManager::new(config.database.clone()).with_transactional_imports(config.import.transactional),
    );
    let port = config.api.port;
    let app = router(AppState::new(config, databases.clone()));

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("Backoffice API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    databases.close_all().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
