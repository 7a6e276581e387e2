//! Availability resolution for a single trainer.
//!
//! A slot is bookable when one active weekly window of the trainer fully
//! contains it (boundaries inclusive) and no non-cancelled appointment of that
//! trainer on the same date overlaps it (half-open, so back-to-back sessions
//! are fine).

use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::debug;

use crate::models::DayOfWeek;
use crate::repository::{RepositoryResult, ScheduleRepository};

/// A requested `[start, end)` interval on one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Slot {
    /// Build the slot starting at `start` and lasting `duration_minutes`.
    ///
    /// Returns `None` for non-positive durations and for slots that would run
    /// past midnight, which no weekly window can contain.
    pub fn starting_at(date: NaiveDate, start: NaiveTime, duration_minutes: i64) -> Option<Self> {
        if duration_minutes <= 0 {
            return None;
        }
        let (end, wrapped_secs) =
            start.overflowing_add_signed(Duration::try_minutes(duration_minutes)?);
        if wrapped_secs != 0 {
            return None;
        }
        Some(Self { date, start, end })
    }

    pub fn day_of_week(&self) -> DayOfWeek {
        DayOfWeek::of(self.date)
    }
}

/// Outcome of checking one trainer against one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotCheck {
    Available,
    OutsideWorkingHours,
    Conflict { appointment_id: i32 },
}

impl SlotCheck {
    pub fn is_available(&self) -> bool {
        matches!(self, SlotCheck::Available)
    }
}

/// Check a slot against the trainer's windows, then against their bookings.
///
/// Always reads current store state; nothing is cached between calls.
pub async fn check_slot(
    repo: &dyn ScheduleRepository,
    trainer_id: i32,
    slot: &Slot,
) -> RepositoryResult<SlotCheck> {
    let windows = repo
        .availability_windows(trainer_id, slot.day_of_week())
        .await?;
    let within_hours = windows
        .iter()
        .any(|w| w.is_active && w.contains(slot.start, slot.end));
    if !within_hours {
        debug!(
            "Trainer {} has no window covering {}-{} on {:?}",
            trainer_id,
            slot.start,
            slot.end,
            slot.day_of_week()
        );
        return Ok(SlotCheck::OutsideWorkingHours);
    }

    let booked = repo.appointments_on(trainer_id, slot.date).await?;
    if let Some(existing) = booked
        .iter()
        .find(|a| a.status.occupies_slot() && a.overlaps(slot.start, slot.end))
    {
        debug!(
            "Trainer {} slot {}-{} on {} conflicts with appointment {}",
            trainer_id, slot.start, slot.end, slot.date, existing.id
        );
        return Ok(SlotCheck::Conflict {
            appointment_id: existing.id,
        });
    }

    Ok(SlotCheck::Available)
}

/// Whether the trainer can take `duration_minutes` starting at `start` on
/// `date`.
pub async fn is_available(
    repo: &dyn ScheduleRepository,
    trainer_id: i32,
    date: NaiveDate,
    start: NaiveTime,
    duration_minutes: i64,
) -> RepositoryResult<bool> {
    match Slot::starting_at(date, start, duration_minutes) {
        Some(slot) => Ok(check_slot(repo, trainer_id, &slot).await?.is_available()),
        None => Ok(false),
    }
}
