//! Payment request storage
//!
//! The in-memory store is always available; the PostgreSQL store needs the
//! `database` feature.

pub mod error;
pub mod memory;
pub mod repository;

#[cfg(feature = "database")]
pub mod payment_repository;

pub use memory::InMemoryPaymentStore;
pub use repository::{ApplyOutcome, PaymentStore};

#[cfg(feature = "database")]
pub use pool::*;

#[cfg(feature = "database")]
mod pool {
    use super::error::StoreError;
    use sqlx::postgres::PgPoolOptions;
    use sqlx::PgPool;
    use std::time::Duration;
    use tracing::{error as log_error, info, warn};

    /// Database pool configuration
    #[derive(Debug, Clone)]
    pub struct PoolConfig {
        pub max_connections: u32,
        pub min_connections: u32,
        pub connection_timeout: Duration,
        pub idle_timeout: Duration,
        pub max_lifetime: Duration,
    }

    impl Default for PoolConfig {
        fn default() -> Self {
            Self {
                max_connections: 20,
                min_connections: 1,
                connection_timeout: Duration::from_secs(30),
                idle_timeout: Duration::from_secs(600),
                max_lifetime: Duration::from_secs(1800),
            }
        }
    }

    /// Initialize the database connection pool
    pub async fn init_pool(
        database_url: &str,
        config: Option<PoolConfig>,
    ) -> Result<PgPool, StoreError> {
        let config = config.unwrap_or_default();

        info!(
            "Initializing database pool: max_connections={}, min_connections={}, connection_timeout={:?}",
            config.max_connections, config.min_connections, config.connection_timeout
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connection_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect(database_url)
            .await
            .map_err(|e| {
                log_error!("Failed to initialize database pool: {}", e);
                StoreError::from_sqlx(e)
            })?;

        info!("Database pool initialized successfully");
        Ok(pool)
    }

    /// Connection pool health check
    pub async fn health_check(pool: &PgPool) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(pool).await.map_err(|e| {
            warn!("Health check failed: {}", e);
            StoreError::from_sqlx(e)
        })?;

        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_default_pool_config() {
            let config = PoolConfig::default();
            assert_eq!(config.max_connections, 20);
            assert_eq!(config.min_connections, 1);
            assert_eq!(config.connection_timeout, Duration::from_secs(30));
        }
    }
}
