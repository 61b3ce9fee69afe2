use crate::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Tables the draft store reads and writes
const REQUIRED_TABLES: [&str; 4] = ["events", "matches", "bets", "users"];

const DEFAULT_MIGRATIONS_DIR: &str = "./migrations";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    Connect(sqlx::Error),

    #[error("Database query error: {0}")]
    Query(sqlx::Error),

    #[error("Database connection timeout")]
    ConnectionTimeout,

    #[error("Database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Schema is missing table '{0}'")]
    MissingTable(&'static str),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DatabaseError::ConnectionTimeout,
            other => DatabaseError::Query(other),
        }
    }
}

/// Open the pool, bring the schema up to date and check that every draft
/// table is present
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    let pool = create_pool(config).await?;
    run_migrations(&pool, None).await?;
    verify_schema(&pool).await?;
    Ok(pool)
}

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    info!(
        "Opening database pool (max {} connections, acquire timeout {:?})",
        config.max_connections,
        config.acquire_timeout()
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .test_before_acquire(config.test_before_acquire)
        .connect(&config.url)
        .await
        .map_err(DatabaseError::Connect)?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(DatabaseError::Connect)?;

    Ok(pool)
}

/// Apply pending migrations from `migrations_path` (default `./migrations`)
pub async fn run_migrations(pool: &PgPool, migrations_path: Option<&str>) -> Result<(), DatabaseError> {
    let path = migrations_path.unwrap_or(DEFAULT_MIGRATIONS_DIR);
    let migrator = sqlx::migrate::Migrator::new(Path::new(path)).await?;
    info!("Running {} migrations from {}", migrator.iter().count(), path);

    migrator.run(pool).await?;
    Ok(())
}

pub async fn verify_schema(pool: &PgPool) -> Result<(), DatabaseError> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            return Err(DatabaseError::MissingTable(table));
        }
    }
    Ok(())
}
