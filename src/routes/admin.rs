//! Administrator approval workflow.
//!
//! GET  /admin/appointments                - Every appointment, newest first
//! POST /admin/appointments/{id}/approve   - Pending -> Approved
//! POST /admin/appointments/{id}/complete  - Approved -> Completed

use axum::extract::Path;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use tracing::info;

use super::identity::Admin;
use crate::booking::SharedBooking;
use crate::error::BookingResult;
use crate::models::{ApiResponse, Appointment};

/// Build the admin router.
pub fn router() -> Router {
    Router::new()
        .route("/admin/appointments", get(list_appointments))
        .route("/admin/appointments/{id}/approve", post(approve_appointment))
        .route("/admin/appointments/{id}/complete", post(complete_appointment))
}

async fn list_appointments(
    Extension(booking): Extension<SharedBooking>,
    _admin: Admin,
) -> BookingResult<Json<ApiResponse<Vec<Appointment>>>> {
    let appointments = booking.all_appointments().await?;
    Ok(Json(ApiResponse {
        message: format!("{} appointments", appointments.len()),
        data: appointments,
    }))
}

async fn approve_appointment(
    Extension(booking): Extension<SharedBooking>,
    Admin(admin): Admin,
    Path(id): Path<i32>,
) -> BookingResult<Json<ApiResponse<Appointment>>> {
    let appointment = booking.approve(id).await?;
    info!("Appointment {} approved by {}", id, admin.user_id);
    Ok(Json(ApiResponse {
        data: appointment,
        message: "Appointment approved".to_string(),
    }))
}

async fn complete_appointment(
    Extension(booking): Extension<SharedBooking>,
    Admin(admin): Admin,
    Path(id): Path<i32>,
) -> BookingResult<Json<ApiResponse<Appointment>>> {
    let appointment = booking.complete(id).await?;
    info!("Appointment {} completed by {}", id, admin.user_id);
    Ok(Json(ApiResponse {
        data: appointment,
        message: "Appointment marked as completed".to_string(),
    }))
}
