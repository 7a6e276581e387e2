//! Database helpers for the gym booking service.
//!
//! Builds the PostgreSQL pool and applies the schema in `migrations/`.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseConfig;

/// Type alias for the application database pool.
pub type AppDb = PgPool;

/// Connect to the booking database and bring its schema up to date.
pub async fn connect_and_migrate(config: &DatabaseConfig) -> anyhow::Result<AppDb> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;
    info!("Connected to booking database");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Booking migrations complete");

    Ok(pool)
}
