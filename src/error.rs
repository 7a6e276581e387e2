//! Error taxonomy returned by the booking engine and rendered by the HTTP
//! layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::models::AppointmentStatus;
use crate::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Service {service_id} does not exist or is no longer offered")]
    ServiceUnavailable { service_id: i32 },

    #[error("Cannot book {date}: date is before today ({today})")]
    PastDateRejected { date: NaiveDate, today: NaiveDate },

    #[error("Trainer {trainer_id} is not available on {date} from {start} to {end}")]
    SlotUnavailable {
        trainer_id: i32,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    },

    #[error("Appointment {appointment_id} is already {status}")]
    AlreadyFinalized {
        appointment_id: i32,
        status: AppointmentStatus,
    },

    #[error("Appointment {appointment_id} cannot move from {from} to {to}")]
    InvalidTransition {
        appointment_id: i32,
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("User {user_id} may not access appointment {appointment_id}")]
    Forbidden { user_id: String, appointment_id: i32 },

    #[error("Invalid {field}: {reason}")]
    MalformedInput { field: &'static str, reason: String },

    #[error("Storage failure: {0}")]
    StorageFailure(#[from] RepositoryError),
}

pub type BookingResult<T> = Result<T, BookingError>;

impl BookingError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        BookingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        BookingError::MalformedInput {
            field,
            reason: reason.into(),
        }
    }

    /// Stable identifier of the error kind for API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::ServiceUnavailable { .. } => "service_unavailable",
            BookingError::PastDateRejected { .. } => "past_date_rejected",
            BookingError::SlotUnavailable { .. } => "slot_unavailable",
            BookingError::AlreadyFinalized { .. } => "already_finalized",
            BookingError::InvalidTransition { .. } => "invalid_transition",
            BookingError::NotFound { .. } => "not_found",
            BookingError::Forbidden { .. } => "forbidden",
            BookingError::MalformedInput { .. } => "malformed_input",
            BookingError::StorageFailure(_) => "storage_failure",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::MalformedInput { .. } | BookingError::PastDateRejected { .. } => {
                StatusCode::BAD_REQUEST
            }
            BookingError::Forbidden { .. } => StatusCode::FORBIDDEN,
            BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BookingError::SlotUnavailable { .. }
            | BookingError::AlreadyFinalized { .. }
            | BookingError::InvalidTransition { .. } => StatusCode::CONFLICT,
            BookingError::ServiceUnavailable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BookingError::StorageFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Store failures are transient from the caller's point of view.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::StorageFailure(_))
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            BookingError::StorageFailure(err) => {
                error!("Storage failure while handling request: {}", err);
                "The booking service is temporarily unavailable, please retry later".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "kind": self.kind(),
                "message": message,
                "retryable": self.is_retryable(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_failure_is_retryable_and_unavailable() {
        let err = BookingError::from(RepositoryError::Connection("pool timed out".into()));
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.kind(), "storage_failure");
    }

    #[test]
    fn test_validation_errors_name_their_context() {
        let err = BookingError::malformed("startTime", "expected HH:MM, got 9am");
        assert_eq!(err.to_string(), "Invalid startTime: expected HH:MM, got 9am");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_retryable());

        let err = BookingError::AlreadyFinalized {
            appointment_id: 7,
            status: AppointmentStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "Appointment 7 is already cancelled");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
