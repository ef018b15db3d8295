//! Persistence layer: the document-store abstraction, its backends, typed
//! record schemas and per-collection repositories.

pub mod collections;
pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repositories;
pub mod store;

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

pub use error::DbError;
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;
pub use store::{DocumentStore, StoreHandle};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

/// Which [`DocumentStore`] implementation the binaries run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    Memory,
}

impl StoreBackend {
    /// Read `STORE_BACKEND` (`postgres` or `memory`, default `postgres`) and,
    /// for Postgres, `DATABASE_URL`.
    pub fn from_env() -> Result<Self, String> {
        let backend = std::env::var("STORE_BACKEND").unwrap_or_else(|_| "postgres".into());
        match backend.as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" => std::env::var("DATABASE_URL")
                .map(|database_url| Self::Postgres { database_url })
                .map_err(|_| "DATABASE_URL must be set when STORE_BACKEND=postgres".to_string()),
            other => Err(format!(
                "Unknown STORE_BACKEND '{other}'. Valid backends: postgres, memory"
            )),
        }
    }
}

/// Error opening a store backend.
#[derive(Debug, thiserror::Error)]
pub enum OpenStoreError {
    #[error("Failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("Database health check failed: {0}")]
    HealthCheck(#[source] sqlx::Error),

    #[error("Failed to run database migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Connect, health-check and migrate the selected backend, returning the
/// shared handle every component is constructed with.
pub async fn open_store(backend: &StoreBackend) -> Result<StoreHandle, OpenStoreError> {
    match backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store; data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres { database_url } => {
            let pool = create_pool(database_url)
                .await
                .map_err(OpenStoreError::Connect)?;
            tracing::info!("Database connection pool created");

            health_check(&pool)
                .await
                .map_err(OpenStoreError::HealthCheck)?;
            tracing::info!("Database health check passed");

            run_migrations(&pool).await?;
            tracing::info!("Database migrations applied");

            Ok(Arc::new(PgDocumentStore::new(pool)))
        }
    }
}
