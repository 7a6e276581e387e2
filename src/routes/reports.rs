//! Reporting routes.
//!
//! GET /api/reports/available-trainers - Trainers free for a date/time/duration
//! GET /api/reports/monthly-stats      - Appointment counts and revenue for a month
//! GET /api/reports/services           - Bookable services
//! GET /api/reports/trainer-stats      - Appointment counts per trainer
//!
//! Query parameters are camelCase; response bodies are snake_case.

use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use axum::routing::get;
use axum::{Extension, Json, Router};
use tracing::info;

use super::{parse_date, parse_time_of_day};
use crate::booking::SharedBooking;
use crate::error::{BookingError, BookingResult};
use crate::models::{
    ApiResponse, AvailableTrainersQuery, AvailableTrainersResponse, MonthlyStatsQuery,
    ServicesQuery, ServicesResponse, TrainerSummary,
};
use crate::reports::{self, MonthlyStats, TrainerStats};
use crate::repository::SharedRepository;

/// Build the reports router.
pub fn router() -> Router {
    Router::new()
        .route("/api/reports/available-trainers", get(available_trainers))
        .route("/api/reports/monthly-stats", get(monthly_stats))
        .route("/api/reports/services", get(list_services))
        .route("/api/reports/trainer-stats", get(trainer_stats))
}

fn query_error(err: QueryRejection) -> BookingError {
    BookingError::malformed("query", err.body_text())
}

/// Find every trainer who can take the requested slot.
///
/// `durationMinutes` defaults to 60; `startTime` must be `HH:MM`.
async fn available_trainers(
    Extension(booking): Extension<SharedBooking>,
    query: Result<Query<AvailableTrainersQuery>, QueryRejection>,
) -> BookingResult<Json<ApiResponse<AvailableTrainersResponse>>> {
    let Query(query) = query.map_err(query_error)?;
    let date = parse_date("date", &query.date)?;
    let start_time = parse_time_of_day("startTime", &query.start_time)?;
    if query.duration_minutes <= 0 {
        return Err(BookingError::malformed(
            "durationMinutes",
            format!("must be positive, got {}", query.duration_minutes),
        ));
    }

    let trainers = booking
        .find_available(date, start_time, query.duration_minutes)
        .await?;
    info!(
        "{} trainers available on {} at {} for {} minutes",
        trainers.len(),
        date,
        start_time,
        query.duration_minutes
    );

    let trainers: Vec<TrainerSummary> = trainers.into_iter().map(TrainerSummary::from).collect();
    Ok(Json(ApiResponse {
        message: format!("{} trainers available", trainers.len()),
        data: AvailableTrainersResponse {
            date,
            start_time,
            duration_minutes: query.duration_minutes,
            count: trainers.len(),
            trainers,
        },
    }))
}

async fn monthly_stats(
    Extension(repo): Extension<SharedRepository>,
    query: Result<Query<MonthlyStatsQuery>, QueryRejection>,
) -> BookingResult<Json<ApiResponse<MonthlyStats>>> {
    let Query(query) = query.map_err(query_error)?;
    let stats = reports::monthly_stats(repo.as_ref(), query.year, query.month).await?;
    Ok(Json(ApiResponse {
        data: stats,
        message: format!("Statistics for {}-{:02}", query.year, query.month),
    }))
}

async fn list_services(
    Extension(repo): Extension<SharedRepository>,
    query: Result<Query<ServicesQuery>, QueryRejection>,
) -> BookingResult<Json<ApiResponse<ServicesResponse>>> {
    let Query(query) = query.map_err(query_error)?;
    let services = repo.list_services(query.active_only).await?;
    Ok(Json(ApiResponse {
        data: ServicesResponse {
            count: services.len(),
            services,
        },
        message: "Services retrieved".to_string(),
    }))
}

async fn trainer_stats(
    Extension(repo): Extension<SharedRepository>,
) -> BookingResult<Json<ApiResponse<Vec<TrainerStats>>>> {
    let stats = reports::trainer_stats(repo.as_ref()).await?;
    Ok(Json(ApiResponse {
        message: format!("Statistics for {} trainers", stats.len()),
        data: stats,
    }))
}
