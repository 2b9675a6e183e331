use sqlx::{Pool, Sqlite};
use tracing::info;

/// Embedded migration scripts
const MIGRATION_001_INITIAL: &str = include_str!("../migrations/001_initial.sql");

/// Run all embedded migrations
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    info!("Running migration 001: Initial schema");
    sqlx::query(MIGRATION_001_INITIAL).execute(pool).await?;

    info!("All migrations completed successfully");
    Ok(())
}
