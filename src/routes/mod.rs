//! HTTP route modules for the gym booking service.
//!
//! - `reports`: available trainers, monthly and trainer statistics, services
//! - `appointments`: member booking, listing and cancellation
//! - `admin`: approval workflow
//! - `health`: store health probe
//! - `identity`: caller extraction from gateway headers

pub mod admin;
pub mod appointments;
pub mod health;
pub mod identity;
pub mod reports;

use chrono::{NaiveDate, NaiveTime};

use crate::error::BookingError;

/// Parse a time of day given as `HH:MM` or `HH:MM:SS`.
pub(crate) fn parse_time_of_day(field: &'static str, value: &str) -> Result<NaiveTime, BookingError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| BookingError::malformed(field, format!("expected HH:MM, got {:?}", value)))
}

/// Parse a calendar date given as `YYYY-MM-DD`.
pub(crate) fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, BookingError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| BookingError::malformed(field, format!("expected YYYY-MM-DD, got {:?}", value)))
}
