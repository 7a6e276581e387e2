//! Member appointment routes.
//!
//! POST /appointments             - Book an appointment
//! GET  /appointments             - The caller's appointments, newest first
//! GET  /appointments/{id}        - One appointment (owner or admin)
//! POST /appointments/{id}/cancel - Cancel a pending or approved appointment

use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};

use super::parse_time_of_day;
use crate::booking::{BookingRequest, Requester, SharedBooking};
use crate::error::{BookingError, BookingResult};
use crate::models::{ApiResponse, Appointment, CancelResponse, CreateAppointmentRequest};

/// Build the appointments router.
pub fn router() -> Router {
    Router::new()
        .route("/appointments", post(create_appointment).get(my_appointments))
        .route("/appointments/{id}", get(get_appointment))
        .route("/appointments/{id}/cancel", post(cancel_appointment))
}

/// Book an appointment for the caller. The end time is derived from the
/// service duration.
async fn create_appointment(
    Extension(booking): Extension<SharedBooking>,
    requester: Requester,
    body: Result<Json<CreateAppointmentRequest>, JsonRejection>,
) -> BookingResult<(StatusCode, Json<ApiResponse<Appointment>>)> {
    let Json(req) = body.map_err(|e| BookingError::malformed("body", e.body_text()))?;
    let start_time = parse_time_of_day("start_time", &req.start_time)?;

    let appointment = booking
        .create(BookingRequest {
            user_id: requester.user_id,
            trainer_id: req.trainer_id,
            service_id: req.service_id,
            date: req.appointment_date,
            start_time,
            notes: req.notes.filter(|n| !n.trim().is_empty()),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: appointment,
            message: "Appointment created successfully".to_string(),
        }),
    ))
}

async fn my_appointments(
    Extension(booking): Extension<SharedBooking>,
    requester: Requester,
) -> BookingResult<Json<ApiResponse<Vec<Appointment>>>> {
    let appointments = booking.user_appointments(&requester.user_id).await?;
    Ok(Json(ApiResponse {
        message: format!("{} appointments", appointments.len()),
        data: appointments,
    }))
}

async fn get_appointment(
    Extension(booking): Extension<SharedBooking>,
    requester: Requester,
    Path(id): Path<i32>,
) -> BookingResult<Json<ApiResponse<Appointment>>> {
    let appointment = booking.appointment_details(id, &requester).await?;
    Ok(Json(ApiResponse {
        data: appointment,
        message: "Appointment retrieved".to_string(),
    }))
}

async fn cancel_appointment(
    Extension(booking): Extension<SharedBooking>,
    requester: Requester,
    Path(id): Path<i32>,
) -> BookingResult<Json<ApiResponse<CancelResponse>>> {
    let appointment = booking.cancel(id, &requester).await?;
    Ok(Json(ApiResponse {
        data: CancelResponse {
            cancelled: true,
            appointment,
        },
        message: "Appointment cancelled".to_string(),
    }))
}
