//! Domain models for the gym booking service.
//!
//! These structs map to the tables in the gym booking database. Times of day
//! are `NaiveTime` and calendar dates are `NaiveDate`; the service runs in a
//! single implicit local time zone, so no offsets are stored.

use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Longest accepted appointment note, in characters.
pub const MAX_NOTES_LEN: usize = 500;

/// Bounds on a service's session length, in minutes.
pub const MIN_SERVICE_MINUTES: i32 = 15;
pub const MAX_SERVICE_MINUTES: i32 = 240;

/// Upper bound on a service's price.
pub const MAX_SERVICE_PRICE: i32 = 10_000;

// ============================================================================
// Enums
// ============================================================================

/// Day of the week, numbered from Sunday = 0 as stored in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Sunday,
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Sun => DayOfWeek::Sunday,
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
        }
    }
}

/// Lifecycle of an appointment. `Cancelled` and `Completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Cancelled | AppointmentStatus::Completed
        )
    }

    /// Whether an appointment in this status holds its slot.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    /// Whether an appointment in this status counts towards revenue.
    pub fn is_billable(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Approved | AppointmentStatus::Completed
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Database Models (sqlx::FromRow)
// ============================================================================

/// A trainer together with their specialties and weekly availability.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Trainer {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub bio: Option<String>,
    pub hourly_rate: BigDecimal,
    pub created_at: NaiveDateTime,
    #[sqlx(skip)]
    pub specialties: Vec<String>,
    #[sqlx(skip)]
    pub availability: Vec<AvailabilityWindow>,
}

/// A recurring weekly interval during which a trainer takes bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AvailabilityWindow {
    pub id: i32,
    pub trainer_id: i32,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
}

impl AvailabilityWindow {
    /// Rejects windows that do not open before they close.
    pub fn validate(&self) -> Result<(), String> {
        if self.start_time >= self.end_time {
            return Err(format!(
                "availability window must start before it ends ({} >= {})",
                self.start_time, self.end_time
            ));
        }
        Ok(())
    }

    /// Inclusive containment: a slot may start at opening and end at closing.
    pub fn contains(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start_time <= start && self.end_time >= end
    }
}

/// A bookable service such as a yoga or personal-training session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price: BigDecimal,
    pub is_active: bool,
}

impl Service {
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_SERVICE_MINUTES..=MAX_SERVICE_MINUTES).contains(&self.duration_minutes) {
            return Err(format!(
                "service duration must be between {} and {} minutes, got {}",
                MIN_SERVICE_MINUTES, MAX_SERVICE_MINUTES, self.duration_minutes
            ));
        }
        if self.price < BigDecimal::from(0) || self.price > BigDecimal::from(MAX_SERVICE_PRICE) {
            return Err(format!(
                "service price must be between 0 and {}, got {}",
                MAX_SERVICE_PRICE, self.price
            ));
        }
        Ok(())
    }
}

/// A booked session between a member and a trainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Appointment {
    pub id: i32,
    pub user_id: String,
    pub trainer_id: i32,
    pub service_id: i32,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Appointment {
    /// Half-open overlap: back-to-back sessions do not conflict.
    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start_time < end && self.end_time > start
    }
}

/// A validated appointment about to be persisted. Only the booking engine
/// builds these.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub user_id: String,
    pub trainer_id: i32,
    pub service_id: i32,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

/// One appointment of a month joined with the service it books.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MonthlyAppointmentRow {
    pub status: AppointmentStatus,
    pub service_name: String,
    pub price: BigDecimal,
}

/// The status of one appointment, keyed by its trainer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrainerStatusRow {
    pub trainer_id: i32,
    pub status: AppointmentStatus,
}

// ============================================================================
// Request Models (Deserialize from JSON input)
// ============================================================================
//
// JSON bodies and responses use snake_case field names. Query strings use
// camelCase parameters (`startTime`, `durationMinutes`, `activeOnly`).

/// Request body for booking an appointment. The end time is never accepted
/// from the client.
#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub trainer_id: i32,
    pub service_id: i32,
    pub appointment_date: NaiveDate,
    pub start_time: String,
    pub notes: Option<String>,
}

/// Query string of the available-trainers lookup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTrainersQuery {
    pub date: String,
    pub start_time: String,
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: i64,
}

fn default_duration_minutes() -> i64 {
    60
}

/// Query string of the monthly statistics report.
#[derive(Debug, Deserialize)]
pub struct MonthlyStatsQuery {
    pub year: i32,
    pub month: u32,
}

/// Query string of the services listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicesQuery {
    #[serde(default = "default_active_only")]
    pub active_only: bool,
}

fn default_active_only() -> bool {
    true
}

// ============================================================================
// Response Models
// ============================================================================

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub message: String,
}

/// Public view of a trainer returned by the availability lookup.
#[derive(Debug, Serialize)]
pub struct TrainerSummary {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub hourly_rate: BigDecimal,
    pub specialties: Vec<String>,
}

impl From<Trainer> for TrainerSummary {
    fn from(trainer: Trainer) -> Self {
        Self {
            id: trainer.id,
            full_name: trainer.full_name,
            email: trainer.email,
            phone_number: trainer.phone_number,
            hourly_rate: trainer.hourly_rate,
            specialties: trainer.specialties,
        }
    }
}

/// Response for the available-trainers lookup.
#[derive(Debug, Serialize)]
pub struct AvailableTrainersResponse {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: i64,
    pub count: usize,
    pub trainers: Vec<TrainerSummary>,
}

/// Response for a cancellation.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
    pub appointment: Appointment,
}

/// Response for the services listing.
#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub count: usize,
    pub services: Vec<Service>,
}
