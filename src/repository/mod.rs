//! Schedule store abstraction.
//!
//! The booking engine only ever talks to the store through
//! [`ScheduleRepository`], so the PostgreSQL store and the in-memory store can
//! be swapped via dependency injection.
//!
//! - [`postgres`]: sqlx-backed store used in production
//! - [`memory`]: in-process store for tests and local development

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{
    Appointment, AppointmentStatus, AvailabilityWindow, DayOfWeek, MonthlyAppointmentRow,
    NewAppointment, Service, Trainer, TrainerStatusRow,
};

pub use memory::MemoryScheduleRepository;
pub use postgres::PgScheduleRepository;

/// Shared handle to whichever store the application was started with.
pub type SharedRepository = Arc<dyn ScheduleRepository>;

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// SQLSTATE raised by PostgreSQL when an exclusion constraint rejects a row.
const EXCLUSION_VIOLATION: &str = "23P01";

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The insert would overlap a non-cancelled appointment of the same
    /// trainer on the same date.
    #[error("Slot conflict: {0}")]
    SlotConflict(String),

    #[error("Data validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err)
                if db_err.code().as_deref() == Some(EXCLUSION_VIOLATION) =>
            {
                RepositoryError::SlotConflict(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                RepositoryError::Connection(err.to_string())
            }
            sqlx::Error::RowNotFound => RepositoryError::NotFound(err.to_string()),
            _ => RepositoryError::Query(err.to_string()),
        }
    }
}

/// Queries and writes the booking engine needs from the schedule store.
///
/// Implementations must be `Send + Sync` so one instance can be shared by
/// every request handler.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Trainers ====================

    /// All trainers with specialties and availability windows loaded, in the
    /// store's natural order.
    async fn list_trainers(&self) -> RepositoryResult<Vec<Trainer>>;

    async fn find_trainer(&self, trainer_id: i32) -> RepositoryResult<Option<Trainer>>;

    /// Every window of a trainer on one weekday, active or not.
    async fn availability_windows(
        &self,
        trainer_id: i32,
        day: DayOfWeek,
    ) -> RepositoryResult<Vec<AvailabilityWindow>>;

    // ==================== Services ====================

    async fn find_service(&self, service_id: i32) -> RepositoryResult<Option<Service>>;

    async fn list_services(&self, active_only: bool) -> RepositoryResult<Vec<Service>>;

    // ==================== Appointments ====================

    /// Every appointment of a trainer on a date, whatever its status.
    async fn appointments_on(
        &self,
        trainer_id: i32,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<Appointment>>;

    async fn find_appointment(&self, appointment_id: i32)
        -> RepositoryResult<Option<Appointment>>;

    /// A user's appointments, newest date first, then latest start first.
    async fn appointments_for_user(&self, user_id: &str) -> RepositoryResult<Vec<Appointment>>;

    /// Every appointment, newest date first, then latest start first.
    async fn list_appointments(&self) -> RepositoryResult<Vec<Appointment>>;

    /// Persist a new pending appointment.
    ///
    /// The overlap re-check and the insert must be atomic with respect to
    /// other inserts for the same trainer and date: when a non-cancelled
    /// appointment overlapping `[start_time, end_time)` exists at commit time
    /// the call fails with [`RepositoryError::SlotConflict`].
    async fn insert_appointment(&self, new: &NewAppointment) -> RepositoryResult<Appointment>;

    /// Compare-and-set the status of an appointment.
    ///
    /// Returns the updated appointment, or `None` when the appointment is not
    /// currently in `expected`.
    async fn update_appointment_status(
        &self,
        appointment_id: i32,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> RepositoryResult<Option<Appointment>>;

    // ==================== Reporting ====================

    async fn appointments_in_month(
        &self,
        year: i32,
        month: u32,
    ) -> RepositoryResult<Vec<MonthlyAppointmentRow>>;

    async fn trainer_statuses(&self) -> RepositoryResult<Vec<TrainerStatusRow>>;
}
