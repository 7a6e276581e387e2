//! Store-backed booking orchestrator.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info, warn};

use super::availability::{self, check_slot, Slot, SlotCheck};
use super::search::find_available_trainers;
use super::status::{self, Rejection, Transition};
use super::{BookingRequest, BookingService, Requester};
use crate::error::{BookingError, BookingResult};
use crate::models::{Appointment, NewAppointment, Trainer, MAX_NOTES_LEN};
use crate::repository::{RepositoryError, SharedRepository};

/// Source of the current local date and time.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Implements [`BookingService`] over any [`ScheduleRepository`].
///
/// [`ScheduleRepository`]: crate::repository::ScheduleRepository
pub struct BookingEngine {
    repo: SharedRepository,
    clock: Clock,
}

impl BookingEngine {
    pub fn new(repo: SharedRepository) -> Self {
        Self::with_clock(repo, Arc::new(|| Local::now().naive_local()))
    }

    pub fn with_clock(repo: SharedRepository, clock: Clock) -> Self {
        Self { repo, clock }
    }

    fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    async fn load_appointment(&self, appointment_id: i32) -> BookingResult<Appointment> {
        self.repo
            .find_appointment(appointment_id)
            .await?
            .ok_or_else(|| BookingError::not_found("appointment", appointment_id))
    }

    /// Apply a transition with compare-and-set, re-reading the appointment
    /// whenever a concurrent writer changed its status first.
    async fn transition(
        &self,
        mut appointment: Appointment,
        transition: Transition,
    ) -> BookingResult<Appointment> {
        loop {
            let next = status::apply(appointment.status, transition).map_err(|rejection| {
                match rejection {
                    Rejection::AlreadyFinalized => BookingError::AlreadyFinalized {
                        appointment_id: appointment.id,
                        status: appointment.status,
                    },
                    Rejection::NotPermitted => BookingError::InvalidTransition {
                        appointment_id: appointment.id,
                        from: appointment.status,
                        to: transition.target(),
                    },
                }
            })?;

            match self
                .repo
                .update_appointment_status(appointment.id, appointment.status, next)
                .await?
            {
                Some(updated) => {
                    info!(
                        "Appointment {} moved from {} to {}",
                        updated.id, appointment.status, updated.status
                    );
                    return Ok(updated);
                }
                None => {
                    debug!(
                        "Appointment {} changed status concurrently, re-reading",
                        appointment.id
                    );
                    appointment = self.load_appointment(appointment.id).await?;
                }
            }
        }
    }
}

fn slot_unavailable(request: &BookingRequest, duration_minutes: i64) -> BookingError {
    BookingError::SlotUnavailable {
        trainer_id: request.trainer_id,
        date: request.date,
        start: request.start_time,
        end: request.start_time + Duration::minutes(duration_minutes),
    }
}

#[async_trait]
impl BookingService for BookingEngine {
    async fn is_available(
        &self,
        trainer_id: i32,
        date: NaiveDate,
        start: NaiveTime,
        duration_minutes: i64,
    ) -> BookingResult<bool> {
        Ok(availability::is_available(self.repo.as_ref(), trainer_id, date, start, duration_minutes).await?)
    }

    async fn find_available(
        &self,
        date: NaiveDate,
        start: NaiveTime,
        duration_minutes: i64,
    ) -> BookingResult<Vec<Trainer>> {
        Ok(find_available_trainers(self.repo.as_ref(), date, start, duration_minutes).await?)
    }

    async fn create(&self, request: BookingRequest) -> BookingResult<Appointment> {
        if let Some(notes) = &request.notes {
            let len = notes.chars().count();
            if len > MAX_NOTES_LEN {
                return Err(BookingError::malformed(
                    "notes",
                    format!("at most {} characters allowed, got {}", MAX_NOTES_LEN, len),
                ));
            }
        }

        let service = self
            .repo
            .find_service(request.service_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or(BookingError::ServiceUnavailable {
                service_id: request.service_id,
            })?;

        let now = self.now();
        let today = now.date();
        if request.date < today {
            return Err(BookingError::PastDateRejected {
                date: request.date,
                today,
            });
        }

        if self.repo.find_trainer(request.trainer_id).await?.is_none() {
            return Err(BookingError::not_found("trainer", request.trainer_id));
        }

        let duration = i64::from(service.duration_minutes);
        let slot = Slot::starting_at(request.date, request.start_time, duration)
            .ok_or_else(|| slot_unavailable(&request, duration))?;

        match check_slot(self.repo.as_ref(), request.trainer_id, &slot).await? {
            SlotCheck::Available => {}
            refused => {
                info!(
                    "Booking refused for trainer {} on {} {}-{}: {:?}",
                    request.trainer_id, slot.date, slot.start, slot.end, refused
                );
                return Err(slot_unavailable(&request, duration));
            }
        }

        let new = NewAppointment {
            user_id: request.user_id.clone(),
            trainer_id: request.trainer_id,
            service_id: service.id,
            appointment_date: slot.date,
            start_time: slot.start,
            end_time: slot.end,
            notes: request.notes.clone(),
            created_at: now,
        };

        match self.repo.insert_appointment(&new).await {
            Ok(appointment) => {
                info!(
                    "Appointment {} booked: user {} with trainer {} on {} {}-{}",
                    appointment.id,
                    appointment.user_id,
                    appointment.trainer_id,
                    appointment.appointment_date,
                    appointment.start_time,
                    appointment.end_time
                );
                Ok(appointment)
            }
            Err(RepositoryError::SlotConflict(reason)) => {
                warn!("Lost booking race for trainer {}: {}", request.trainer_id, reason);
                Err(slot_unavailable(&request, duration))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn cancel(&self, appointment_id: i32, requester: &Requester) -> BookingResult<Appointment> {
        let appointment = self.load_appointment(appointment_id).await?;
        if !requester.can_access(&appointment) {
            return Err(BookingError::Forbidden {
                user_id: requester.user_id.clone(),
                appointment_id,
            });
        }
        self.transition(appointment, Transition::Cancel).await
    }

    async fn approve(&self, appointment_id: i32) -> BookingResult<Appointment> {
        let appointment = self.load_appointment(appointment_id).await?;
        self.transition(appointment, Transition::Approve).await
    }

    async fn complete(&self, appointment_id: i32) -> BookingResult<Appointment> {
        let appointment = self.load_appointment(appointment_id).await?;
        self.transition(appointment, Transition::Complete).await
    }

    async fn user_appointments(&self, user_id: &str) -> BookingResult<Vec<Appointment>> {
        Ok(self.repo.appointments_for_user(user_id).await?)
    }

    async fn appointment_details(
        &self,
        appointment_id: i32,
        requester: &Requester,
    ) -> BookingResult<Appointment> {
        let appointment = self.load_appointment(appointment_id).await?;
        if !requester.can_access(&appointment) {
            return Err(BookingError::Forbidden {
                user_id: requester.user_id.clone(),
                appointment_id,
            });
        }
        Ok(appointment)
    }

    async fn all_appointments(&self) -> BookingResult<Vec<Appointment>> {
        Ok(self.repo.list_appointments().await?)
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use chrono::Datelike;
    use tokio::sync::Barrier;

    use super::*;

    use crate::models::{
        AppointmentStatus, AvailabilityWindow, DayOfWeek, MonthlyAppointmentRow, Service,
        TrainerStatusRow,
    };
    use crate::repository::{MemoryScheduleRepository, RepositoryResult, ScheduleRepository};

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    // Wednesday 2030-01-02, 08:00.
    fn fixed_clock() -> Clock {
        Arc::new(|| {
            NaiveDate::from_ymd_opt(2030, 1, 2)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
        })
    }

    fn next_monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
    }

    struct Gym {
        repo: MemoryScheduleRepository,
        engine: BookingEngine,
        trainer: i32,
        fitness: i32,
    }

    fn gym() -> Gym {
        let repo = MemoryScheduleRepository::new();
        let trainer = repo
            .add_trainer("Ahmet Yilmaz", "ahmet@gym.com", Some("555-0001"), BigDecimal::from(300))
            .unwrap();
        repo.add_window(trainer, DayOfWeek::Monday, time(9, 0), time(17, 0))
            .unwrap();
        repo.add_window(trainer, DayOfWeek::Wednesday, time(9, 0), time(17, 0))
            .unwrap();
        let fitness = repo.add_service("Fitness", 90, BigDecimal::from(300)).unwrap();
        let engine = BookingEngine::with_clock(Arc::new(repo.clone()), fixed_clock());
        Gym {
            repo,
            engine,
            trainer,
            fitness,
        }
    }

    fn request(gym: &Gym, user: &str, date: NaiveDate, start: NaiveTime) -> BookingRequest {
        BookingRequest {
            user_id: user.to_string(),
            trainer_id: gym.trainer,
            service_id: gym.fitness,
            date,
            start_time: start,
            notes: None,
        }
    }

    fn member(id: &str) -> Requester {
        Requester::member(id)
    }

    #[tokio::test]
    async fn test_monday_scenario_end_to_end() {
        let gym = gym();
        assert_eq!(next_monday().weekday(), chrono::Weekday::Mon);

        let first = gym
            .engine
            .create(request(&gym, "member-1", next_monday(), time(14, 0)))
            .await
            .unwrap();
        assert_eq!(first.end_time, time(15, 30));
        assert_eq!(first.status, AppointmentStatus::Pending);

        let clash = gym
            .engine
            .create(request(&gym, "member-2", next_monday(), time(15, 0)))
            .await;
        assert!(matches!(clash, Err(BookingError::SlotUnavailable { .. })));

        let approved = gym.engine.approve(first.id).await.unwrap();
        assert_eq!(approved.status, AppointmentStatus::Approved);

        let cancelled = gym.engine.cancel(first.id, &member("member-1")).await.unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

        let rebooked = gym
            .engine
            .create(request(&gym, "member-2", next_monday(), time(14, 0)))
            .await
            .unwrap();
        assert_eq!(rebooked.end_time, time(15, 30));
    }

    #[tokio::test]
    async fn test_adjacent_booking_succeeds() {
        let gym = gym();
        gym.engine
            .create(request(&gym, "member-1", next_monday(), time(10, 0)))
            .await
            .unwrap();
        let adjacent = gym
            .engine
            .create(request(&gym, "member-2", next_monday(), time(11, 30)))
            .await;
        assert!(adjacent.is_ok());
    }

    #[tokio::test]
    async fn test_missing_or_inactive_service_is_unavailable() {
        let gym = gym();
        let mut missing = request(&gym, "member-1", next_monday(), time(10, 0));
        missing.service_id = 999;
        assert!(matches!(
            gym.engine.create(missing).await,
            Err(BookingError::ServiceUnavailable { service_id: 999 })
        ));

        gym.repo.set_service_active(gym.fitness, false).unwrap();
        let inactive = gym
            .engine
            .create(request(&gym, "member-1", next_monday(), time(10, 0)))
            .await;
        assert!(matches!(inactive, Err(BookingError::ServiceUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_past_date_rejected_but_today_allowed() {
        let gym = gym();
        let today = fixed_clock()().date();
        let yesterday = today.pred_opt().unwrap();

        let past = gym
            .engine
            .create(request(&gym, "member-1", yesterday, time(10, 0)))
            .await;
        assert!(matches!(past, Err(BookingError::PastDateRejected { .. })));

        // The fixed clock's today is a Wednesday with a 09:00-17:00 window.
        let same_day = gym
            .engine
            .create(request(&gym, "member-1", today, time(10, 0)))
            .await;
        assert!(same_day.is_ok());
    }

    #[tokio::test]
    async fn test_validation_order_is_service_then_date() {
        let gym = gym();
        let mut req = request(&gym, "member-1", NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), time(10, 0));
        req.service_id = 42;
        assert!(matches!(
            gym.engine.create(req).await,
            Err(BookingError::ServiceUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_trainer_is_not_found() {
        let gym = gym();
        let mut req = request(&gym, "member-1", next_monday(), time(10, 0));
        req.trainer_id = 77;
        assert!(matches!(
            gym.engine.create(req).await,
            Err(BookingError::NotFound { entity: "trainer", .. })
        ));
    }

    #[tokio::test]
    async fn test_outside_working_hours_is_slot_unavailable() {
        let gym = gym();
        let late = gym
            .engine
            .create(request(&gym, "member-1", next_monday(), time(16, 0)))
            .await;
        match late {
            Err(BookingError::SlotUnavailable { start, end, .. }) => {
                assert_eq!(start, time(16, 0));
                assert_eq!(end, time(17, 30));
            }
            other => panic!("expected SlotUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_overlong_notes_are_malformed() {
        let gym = gym();
        let mut req = request(&gym, "member-1", next_monday(), time(10, 0));
        req.notes = Some("x".repeat(MAX_NOTES_LEN + 1));
        assert!(matches!(
            gym.engine.create(req).await,
            Err(BookingError::MalformedInput { field: "notes", .. })
        ));
    }

    #[tokio::test]
    async fn test_end_time_fixed_at_creation() {
        let gym = gym();
        let booked = gym
            .engine
            .create(request(&gym, "member-1", next_monday(), time(9, 0)))
            .await
            .unwrap();

        gym.repo.set_service_duration(gym.fitness, 30).unwrap();

        let reloaded = gym
            .engine
            .appointment_details(booked.id, &member("member-1"))
            .await
            .unwrap();
        assert_eq!(reloaded.end_time - reloaded.start_time, Duration::minutes(90));
    }

    #[tokio::test]
    async fn test_cancel_twice_is_already_finalized() {
        let gym = gym();
        let booked = gym
            .engine
            .create(request(&gym, "member-1", next_monday(), time(9, 0)))
            .await
            .unwrap();
        gym.engine.cancel(booked.id, &member("member-1")).await.unwrap();

        for _ in 0..3 {
            let again = gym.engine.cancel(booked.id, &member("member-1")).await;
            assert!(matches!(
                again,
                Err(BookingError::AlreadyFinalized {
                    status: AppointmentStatus::Cancelled,
                    ..
                })
            ));
        }
        let stored = gym.engine.all_appointments().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_completed_is_already_finalized() {
        let gym = gym();
        let booked = gym
            .engine
            .create(request(&gym, "member-1", next_monday(), time(9, 0)))
            .await
            .unwrap();
        gym.engine.approve(booked.id).await.unwrap();
        gym.engine.complete(booked.id).await.unwrap();

        let result = gym.engine.cancel(booked.id, &member("member-1")).await;
        assert!(matches!(result, Err(BookingError::AlreadyFinalized { .. })));
    }

    #[tokio::test]
    async fn test_cancel_checks_ownership_before_status() {
        let gym = gym();
        let booked = gym
            .engine
            .create(request(&gym, "member-1", next_monday(), time(9, 0)))
            .await
            .unwrap();
        gym.engine.cancel(booked.id, &member("member-1")).await.unwrap();

        let stranger = gym.engine.cancel(booked.id, &member("member-2")).await;
        assert!(matches!(stranger, Err(BookingError::Forbidden { .. })));

        let missing = gym.engine.cancel(404, &member("member-1")).await;
        assert!(matches!(missing, Err(BookingError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_admin_may_cancel_any_appointment() {
        let gym = gym();
        let booked = gym
            .engine
            .create(request(&gym, "member-1", next_monday(), time(9, 0)))
            .await
            .unwrap();

        let cancelled = gym
            .engine
            .cancel(booked.id, &Requester::admin("front-desk"))
            .await
            .unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_invalid_admin_transitions_are_reported() {
        let gym = gym();
        let booked = gym
            .engine
            .create(request(&gym, "member-1", next_monday(), time(9, 0)))
            .await
            .unwrap();

        let premature = gym.engine.complete(booked.id).await;
        assert!(matches!(
            premature,
            Err(BookingError::InvalidTransition {
                from: AppointmentStatus::Pending,
                to: AppointmentStatus::Completed,
                ..
            })
        ));

        gym.engine.approve(booked.id).await.unwrap();
        let twice = gym.engine.approve(booked.id).await;
        assert!(matches!(twice, Err(BookingError::InvalidTransition { .. })));

        assert!(matches!(
            gym.engine.approve(9_999).await,
            Err(BookingError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_user_appointments_are_newest_first() {
        let gym = gym();
        let following_monday = next_monday() + Duration::days(7);
        gym.engine
            .create(request(&gym, "member-1", next_monday(), time(9, 0)))
            .await
            .unwrap();
        gym.engine
            .create(request(&gym, "member-1", next_monday(), time(13, 0)))
            .await
            .unwrap();
        gym.engine
            .create(request(&gym, "member-1", following_monday, time(9, 0)))
            .await
            .unwrap();
        gym.engine
            .create(request(&gym, "member-2", next_monday(), time(15, 0)))
            .await
            .unwrap();

        let mine = gym.engine.user_appointments("member-1").await.unwrap();
        let order: Vec<(NaiveDate, NaiveTime)> = mine
            .iter()
            .map(|a| (a.appointment_date, a.start_time))
            .collect();
        assert_eq!(
            order,
            vec![
                (following_monday, time(9, 0)),
                (next_monday(), time(13, 0)),
                (next_monday(), time(9, 0)),
            ]
        );
    }

    #[tokio::test]
    async fn test_store_outage_surfaces_as_storage_failure() {
        let gym = gym();
        gym.repo.set_healthy(false);

        let result = gym
            .engine
            .create(request(&gym, "member-1", next_monday(), time(9, 0)))
            .await;
        match result {
            Err(err @ BookingError::StorageFailure(_)) => assert!(err.is_retryable()),
            other => panic!("expected StorageFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_overlapping_requests_book_exactly_once() {
        let gym = gym();
        let engine = Arc::new(gym.engine);
        let attempts = 16;

        let mut handles = Vec::new();
        for n in 0..attempts {
            let engine = Arc::clone(&engine);
            let req = BookingRequest {
                user_id: format!("member-{}", n),
                trainer_id: gym.trainer,
                service_id: gym.fitness,
                date: next_monday(),
                start_time: time(10, 0),
                notes: None,
            };
            handles.push(tokio::spawn(async move { engine.create(req).await }));
        }

        let mut booked = 0;
        let mut refused = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => booked += 1,
                Err(BookingError::SlotUnavailable { .. }) | Err(BookingError::StorageFailure(_)) => {
                    refused += 1
                }
                Err(other) => panic!("unexpected error {:?}", other),
            }
        }
        assert_eq!(booked, 1);
        assert_eq!(refused, attempts - 1);
        assert_eq!(gym.repo.list_appointments().await.unwrap().len(), 1);
    }

    /// Store whose `appointments_on` holds every caller at a barrier and then
    /// reports an empty day, so all racing requests pass the availability
    /// check and only the insert can tell them apart.
    struct StaleReads {
        inner: MemoryScheduleRepository,
        barrier: Barrier,
    }

    #[async_trait]
    impl ScheduleRepository for StaleReads {
        async fn health_check(&self) -> RepositoryResult<bool> {
            self.inner.health_check().await
        }

        async fn list_trainers(&self) -> RepositoryResult<Vec<Trainer>> {
            self.inner.list_trainers().await
        }

        async fn find_trainer(&self, trainer_id: i32) -> RepositoryResult<Option<Trainer>> {
            self.inner.find_trainer(trainer_id).await
        }

        async fn availability_windows(
            &self,
            trainer_id: i32,
            day: DayOfWeek,
        ) -> RepositoryResult<Vec<AvailabilityWindow>> {
            self.inner.availability_windows(trainer_id, day).await
        }

        async fn find_service(&self, service_id: i32) -> RepositoryResult<Option<Service>> {
            self.inner.find_service(service_id).await
        }

        async fn list_services(&self, active_only: bool) -> RepositoryResult<Vec<Service>> {
            self.inner.list_services(active_only).await
        }

        async fn appointments_on(
            &self,
            _trainer_id: i32,
            _date: NaiveDate,
        ) -> RepositoryResult<Vec<Appointment>> {
            self.barrier.wait().await;
            Ok(Vec::new())
        }

        async fn find_appointment(
            &self,
            appointment_id: i32,
        ) -> RepositoryResult<Option<Appointment>> {
            self.inner.find_appointment(appointment_id).await
        }

        async fn appointments_for_user(&self, user_id: &str) -> RepositoryResult<Vec<Appointment>> {
            self.inner.appointments_for_user(user_id).await
        }

        async fn list_appointments(&self) -> RepositoryResult<Vec<Appointment>> {
            self.inner.list_appointments().await
        }

        async fn insert_appointment(&self, new: &NewAppointment) -> RepositoryResult<Appointment> {
            self.inner.insert_appointment(new).await
        }

        async fn update_appointment_status(
            &self,
            appointment_id: i32,
            expected: AppointmentStatus,
            next: AppointmentStatus,
        ) -> RepositoryResult<Option<Appointment>> {
            self.inner
                .update_appointment_status(appointment_id, expected, next)
                .await
        }

        async fn appointments_in_month(
            &self,
            year: i32,
            month: u32,
        ) -> RepositoryResult<Vec<MonthlyAppointmentRow>> {
            self.inner.appointments_in_month(year, month).await
        }

        async fn trainer_statuses(&self) -> RepositoryResult<Vec<TrainerStatusRow>> {
            self.inner.trainer_statuses().await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_requests_past_the_availability_check_book_once() {
        let gym = gym();
        let attempts = 8;
        let store = Arc::new(StaleReads {
            inner: gym.repo.clone(),
            barrier: Barrier::new(attempts),
        });
        let engine = Arc::new(BookingEngine::with_clock(store, fixed_clock()));

        let mut handles = Vec::new();
        for n in 0..attempts {
            let engine = Arc::clone(&engine);
            // Staggered starts so every pair of requests overlaps.
            let req = BookingRequest {
                user_id: format!("member-{}", n),
                trainer_id: gym.trainer,
                service_id: gym.fitness,
                date: next_monday(),
                start_time: time(10, 5 * n as u32),
                notes: None,
            };
            handles.push(tokio::spawn(async move { engine.create(req).await }));
        }

        let mut booked = 0;
        let mut refused = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => booked += 1,
                Err(BookingError::SlotUnavailable { .. }) => refused += 1,
                Err(other) => panic!("unexpected error {:?}", other),
            }
        }
        assert_eq!(booked, 1);
        assert_eq!(refused, attempts - 1);

        let stored = gym.repo.list_appointments().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, AppointmentStatus::Pending);
    }
}
