//! PostgreSQL connection establishment for the availability monitor.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::availability::Connector;
use crate::config::DatabaseConfig;
use crate::error::{MarketplaceError, MarketplaceResult};

/// Pooled database handle; cheap to clone
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> MarketplaceResult<bool> {
        let row = sqlx::query("SELECT 1 as health")
            .fetch_one(&self.pool)
            .await?;

        let health: i32 = row.try_get("health")?;
        Ok(health == 1)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Opens the pool from [`DatabaseConfig`]
#[derive(Debug, Clone)]
pub struct PgConnector {
    config: DatabaseConfig,
}

impl PgConnector {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Connection = PgDatabase;

    fn is_configured(&self) -> bool {
        self.config.database_url().is_some()
    }

    async fn connect(&self) -> MarketplaceResult<PgDatabase> {
        let url = self.config.database_url().ok_or_else(|| {
            MarketplaceError::ConfigurationError("DATABASE_URL not defined".to_string())
        })?;
        let url = with_connect_timeout(url, self.config.connect_timeout_seconds);

        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .min_connections(self.config.min_connections)
            .acquire_timeout(self.config.acquire_timeout())
            .test_before_acquire(true)
            .connect(&url)
            .await?;

        let database = PgDatabase::new(pool);
        database.health_check().await?;
        Ok(database)
    }

    async fn health_check(&self, connection: &PgDatabase) -> MarketplaceResult<()> {
        match connection.health_check().await? {
            true => Ok(()),
            false => Err(MarketplaceError::Connectivity(
                "health probe returned an unexpected value".to_string(),
            )),
        }
    }
}

/// Append `connect_timeout` to postgres URLs that do not already set it
pub fn with_connect_timeout(url: &str, seconds: u64) -> String {
    let is_postgres = url.starts_with("postgresql://") || url.starts_with("postgres://");
    if !is_postgres || url.contains("connect_timeout=") {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}connect_timeout={seconds}")
}
