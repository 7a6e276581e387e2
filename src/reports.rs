//! Read-only reporting over appointments.
//!
//! Monthly statistics and per-trainer counts. Nothing here writes to the
//! store.

use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use serde::Serialize;

use crate::error::{BookingError, BookingResult};
use crate::models::AppointmentStatus;
use crate::repository::ScheduleRepository;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusCount {
    pub status: AppointmentStatus,
    pub count: usize,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ServiceCount {
    pub service_name: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct MonthlyStats {
    pub year: i32,
    pub month: u32,
    pub total_appointments: usize,
    pub status_breakdown: Vec<StatusCount>,
    pub service_breakdown: Vec<ServiceCount>,
    /// Sum of service prices over approved and completed appointments.
    pub total_revenue: BigDecimal,
}

#[derive(Debug, Serialize)]
pub struct TrainerStats {
    pub trainer_id: i32,
    pub trainer_name: String,
    pub total_appointments: usize,
    pub pending_appointments: usize,
    pub completed_appointments: usize,
    pub specialties: Vec<String>,
}

pub async fn monthly_stats(
    repo: &dyn ScheduleRepository,
    year: i32,
    month: u32,
) -> BookingResult<MonthlyStats> {
    if !(1..=12).contains(&month) {
        return Err(BookingError::malformed(
            "month",
            format!("must be between 1 and 12, got {}", month),
        ));
    }

    let rows = repo.appointments_in_month(year, month).await?;

    let mut by_status: BTreeMap<&'static str, (AppointmentStatus, usize)> = BTreeMap::new();
    let mut by_service: BTreeMap<&str, usize> = BTreeMap::new();
    let mut total_revenue = BigDecimal::from(0);

    for row in &rows {
        by_status.entry(row.status.as_str()).or_insert((row.status, 0)).1 += 1;
        *by_service.entry(row.service_name.as_str()).or_default() += 1;
        if row.status.is_billable() {
            total_revenue += row.price.clone();
        }
    }

    Ok(MonthlyStats {
        year,
        month,
        total_appointments: rows.len(),
        status_breakdown: by_status
            .into_values()
            .map(|(status, count)| StatusCount { status, count })
            .collect(),
        service_breakdown: by_service
            .into_iter()
            .map(|(name, count)| ServiceCount {
                service_name: name.to_string(),
                count,
            })
            .collect(),
        total_revenue,
    })
}

pub async fn trainer_stats(repo: &dyn ScheduleRepository) -> BookingResult<Vec<TrainerStats>> {
    let trainers = repo.list_trainers().await?;
    let statuses = repo.trainer_statuses().await?;

    let stats = trainers
        .into_iter()
        .map(|trainer| {
            let mine: Vec<AppointmentStatus> = statuses
                .iter()
                .filter(|row| row.trainer_id == trainer.id)
                .map(|row| row.status)
                .collect();
            TrainerStats {
                trainer_id: trainer.id,
                trainer_name: trainer.full_name,
                total_appointments: mine.len(),
                pending_appointments: mine
                    .iter()
                    .filter(|s| **s == AppointmentStatus::Pending)
                    .count(),
                completed_appointments: mine
                    .iter()
                    .filter(|s| **s == AppointmentStatus::Completed)
                    .count(),
                specialties: trainer.specialties,
            }
        })
        .collect();
    Ok(stats)
}
