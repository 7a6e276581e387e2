//! # Gym Booking Service
//!
//! Members book sessions with trainers; administrators approve and complete
//! them. The interesting part is the booking engine: availability
//! resolution against weekly trainer windows and conflict-free appointment
//! creation under concurrent requests.
//!
//! ## Architecture
//!
//! - Axum handles HTTP routing and request/response lifecycle
//! - SQLx manages the PostgreSQL schedule store (or an in-memory store for
//!   local development)
//! - The booking engine is injected into handlers as a trait object

use std::sync::Arc;

use tracing::info;

use gym_booking::config::{Config, StoreBackend};
use gym_booking::repository::{MemoryScheduleRepository, PgScheduleRepository, SharedRepository};
use gym_booking::{create_app, db, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gym_booking=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting gym booking service");

    let config = Config::from_env()?;

    let repo: SharedRepository = match config.store {
        StoreBackend::Postgres => {
            let pool = db::connect_and_migrate(&config.database).await?;
            Arc::new(PgScheduleRepository::new(pool))
        }
        StoreBackend::Memory => {
            let repo = MemoryScheduleRepository::new();
            if config.seed_demo_data {
                seed::demo_data(&repo)?;
                info!("Memory store seeded with demo gym");
            }
            Arc::new(repo)
        }
    };
    info!("Using {:?} schedule store", config.store);

    let app = create_app(repo);

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
