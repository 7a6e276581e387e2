//! Availability & booking engine.
//!
//! - `availability`: does one trainer's schedule admit a slot
//! - `search`: which trainers are free for a slot
//! - `status`: appointment status state machine
//! - `engine`: validates, books and transitions appointments

pub mod availability;
pub mod engine;
pub mod search;
pub mod status;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use crate::error::BookingResult;
use crate::models::{Appointment, Trainer};

pub use engine::BookingEngine;

/// Shared handle to the booking service used by the HTTP layer.
pub type SharedBooking = Arc<dyn BookingService>;

/// Everything needed to book one appointment. The end time is derived from
/// the service, never supplied by the caller.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub user_id: String,
    pub trainer_id: i32,
    pub service_id: i32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub notes: Option<String>,
}

/// The authenticated caller, as vouched for by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub user_id: String,
    pub is_admin: bool,
}

impl Requester {
    pub fn member(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: false,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: true,
        }
    }

    /// Owners see and cancel their own appointments; admins see all of them.
    pub fn can_access(&self, appointment: &Appointment) -> bool {
        self.is_admin || appointment.user_id == self.user_id
    }
}

/// Booking capabilities exposed to the API layer.
#[async_trait]
pub trait BookingService: Send + Sync {
    async fn is_available(
        &self,
        trainer_id: i32,
        date: NaiveDate,
        start: NaiveTime,
        duration_minutes: i64,
    ) -> BookingResult<bool>;

    async fn find_available(
        &self,
        date: NaiveDate,
        start: NaiveTime,
        duration_minutes: i64,
    ) -> BookingResult<Vec<Trainer>>;

    /// Validate and persist a new pending appointment.
    ///
    /// Checks run in order: notes length, service active, date not past,
    /// trainer exists, slot free. The first failure is returned.
    async fn create(&self, request: BookingRequest) -> BookingResult<Appointment>;

    async fn cancel(&self, appointment_id: i32, requester: &Requester) -> BookingResult<Appointment>;

    async fn approve(&self, appointment_id: i32) -> BookingResult<Appointment>;

    async fn complete(&self, appointment_id: i32) -> BookingResult<Appointment>;

    async fn user_appointments(&self, user_id: &str) -> BookingResult<Vec<Appointment>>;

    async fn appointment_details(
        &self,
        appointment_id: i32,
        requester: &Requester,
    ) -> BookingResult<Appointment>;

    async fn all_appointments(&self) -> BookingResult<Vec<Appointment>>;
}
