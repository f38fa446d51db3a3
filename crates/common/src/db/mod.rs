//! Database layer for TubeScribe
//!
//! Provides:
//! - SeaORM entity models
//! - Connection pool setup
//! - Idempotent schema creation and a liveness ping

pub mod models;

use crate::config::{normalize_database_url, redact_url, DatabaseConfig};
use crate::errors::StoreError;
use models::VideoSummaryEntity;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema,
};
use std::time::Duration;
use tracing::info;

/// Open a connection pool for the configured database URL.
///
/// Fails with `Configuration` when no URL is set and with `Connection`
/// when the pool cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, StoreError> {
    let url = config
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| StoreError::Configuration {
            message: "database URL is not set (DATABASE_URL or store.database.url)".to_string(),
        })?;
    let url = normalize_database_url(url);

    info!(url = %redact_url(&url), "Connecting to database...");

    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(config.sqlx_logging);

    Database::connect(opts)
        .await
        .map_err(|e| StoreError::Connection {
            message: format!("Failed to connect: {}", e),
        })
}

/// Create the `video_summaries` table if it does not exist yet.
pub async fn ensure_schema(conn: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    let mut create = schema.create_table_from_entity(VideoSummaryEntity);
    create.if_not_exists();

    conn.execute(backend.build(&create)).await?;
    Ok(())
}

/// Trivial round-trip to check the connection is usable
pub async fn ping(conn: &DatabaseConnection) -> Result<(), DbErr> {
    conn.execute_unprepared("SELECT 1").await?;
    Ok(())
}
