use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;

use edusmart_payments::api::{self, AppState};
use edusmart_payments::config::Config;
use edusmart_payments::database::{InMemoryPaymentStore, PaymentStore};
use edusmart_payments::logging;
use edusmart_payments::payments::providers::AntomProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    logging::init();

    // Load configuration
    let config = Config::load()?;

    // Log startup info
    tracing::info!("Starting EduSmart payments backend");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!(
        "Gateway: {}{} ({})",
        config.gateway.base_url,
        config.gateway.api_path_prefix,
        if config.gateway.is_sandbox() { "sandbox" } else { "live" }
    );

    let gateway = AntomProvider::new(config.gateway.antom_config())
        .context("Failed to initialise the Antom gateway")?;
    let store = payment_store(&config).await?;

    let state = AppState::new(Arc::new(gateway), store, config.checkout.clone())
        .with_environment(config.server.environment.clone(), config.gateway.is_sandbox());
    let app = api::router(state);

    // Start server
    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid server.host {}", config.server.host))?;
    let addr = SocketAddr::from((host, config.server.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

#[cfg(feature = "database")]
async fn payment_store(config: &Config) -> anyhow::Result<Arc<dyn PaymentStore>> {
    use edusmart_payments::database::payment_repository::PaymentRepository;
    use edusmart_payments::database::{health_check, init_pool, PoolConfig};

    let Some(database) = &config.database else {
        tracing::warn!("No database configured, payment requests are kept in memory");
        return Ok(Arc::new(InMemoryPaymentStore::new()));
    };

    let pool = init_pool(
        &database.url,
        Some(PoolConfig {
            max_connections: database.max_connections,
            ..PoolConfig::default()
        }),
    )
    .await
    .context("Failed to connect to the payment database")?;
    health_check(&pool)
        .await
        .context("Payment database is not answering")?;

    let repository = PaymentRepository::new(pool);
    repository
        .ensure_schema()
        .await
        .context("Failed to prepare the payment_requests table")?;

    Ok(Arc::new(repository))
}

#[cfg(not(feature = "database"))]
async fn payment_store(config: &Config) -> anyhow::Result<Arc<dyn PaymentStore>> {
    if config.database.is_some() {
        tracing::warn!("Built without the database feature, ignoring database settings");
    }
    Ok(Arc::new(InMemoryPaymentStore::new()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
