//! Trainer search over a slot.
//!
//! A linear scan: every trainer is loaded and checked with the availability
//! resolver. Fine for a gym with tens of trainers; an index on weekday and
//! time range would be needed well before thousands.

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use super::availability::{check_slot, Slot};
use crate::models::Trainer;
use crate::repository::{RepositoryResult, ScheduleRepository};

/// Trainers free for `duration_minutes` from `start` on `date`, in store order.
pub async fn find_available_trainers(
    repo: &dyn ScheduleRepository,
    date: NaiveDate,
    start: NaiveTime,
    duration_minutes: i64,
) -> RepositoryResult<Vec<Trainer>> {
    let Some(slot) = Slot::starting_at(date, start, duration_minutes) else {
        return Ok(Vec::new());
    };

    let trainers = repo.list_trainers().await?;
    let total = trainers.len();

    let mut available = Vec::new();
    for trainer in trainers {
        if check_slot(repo, trainer.id, &slot).await?.is_available() {
            available.push(trainer);
        }
    }

    debug!(
        "{} of {} trainers free on {} {}-{}",
        available.len(),
        total,
        slot.date,
        slot.start,
        slot.end
    );
    Ok(available)
}
