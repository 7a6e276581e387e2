//! # Gym Booking Service Library
//!
//! Exposes the Axum router and the booking engine so integration tests can
//! create an in-process server without a database.

pub mod booking;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod reports;
pub mod repository;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use booking::{BookingEngine, SharedBooking};
use repository::SharedRepository;

/// Build the Axum router with all route modules and middleware.
///
/// The booking engine is built over the given store, so the same router
/// serves PostgreSQL in production and the memory store in tests.
pub fn create_app(repo: SharedRepository) -> Router {
    let booking: SharedBooking = Arc::new(BookingEngine::new(Arc::clone(&repo)));

    Router::new()
        .merge(routes::reports::router())
        .merge(routes::appointments::router())
        .merge(routes::admin::router())
        .merge(routes::health::router())
        .layer(Extension(booking))
        .layer(Extension(repo))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
