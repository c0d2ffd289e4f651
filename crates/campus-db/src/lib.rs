//! # Campus DB
//!
//! Database pool initialization for the Campus rules service, using SQLx with
//! PostgreSQL.
//!
//! ```ignore
//! use campus_db::{DbConfig, init_db_pool};
//!
//! let pool = init_db_pool(&DbConfig::from_env()?).await?;
//! ```

use sqlx::postgres::PgPoolOptions;
use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    /// Reads `DATABASE_URL` (required) and `DATABASE_MAX_CONNECTIONS` (default 10).
    pub fn from_env() -> Result<Self, env::VarError> {
        let url = env::var("DATABASE_URL")?;
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            url,
            max_connections,
            acquire_timeout: Duration::from_secs(5),
        })
    }
}

/// Initializes a PostgreSQL connection pool.
///
/// The returned pool is cheaply cloneable and is shared by every Postgres
/// repository.
pub async fn init_db_pool(config: &DbConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await
}

// Re-export PgPool for convenience
pub use sqlx::PgPool;
