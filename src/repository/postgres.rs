//! PostgreSQL schedule store.
//!
//! Appointment inserts run in a transaction that takes a transaction-scoped
//! advisory lock on `(trainer_id, date)` before re-checking for overlaps, so
//! two requests for the same trainer and day are serialized. The
//! `appointments_no_overlap` exclusion constraint rejects anything that still
//! slips through.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use sqlx::PgPool;
use tracing::debug;

use super::{RepositoryError, RepositoryResult, ScheduleRepository};
use crate::models::{
    Appointment, AppointmentStatus, AvailabilityWindow, DayOfWeek, MonthlyAppointmentRow,
    NewAppointment, Service, Trainer, TrainerStatusRow,
};

#[derive(Clone)]
pub struct PgScheduleRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct SpecialtyRow {
    trainer_id: i32,
    specialty_name: String,
}

impl PgScheduleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach specialties and availability windows to already loaded trainers.
    async fn load_details(&self, trainers: &mut [Trainer]) -> RepositoryResult<()> {
        if trainers.is_empty() {
            return Ok(());
        }
        let ids: Vec<i32> = trainers.iter().map(|t| t.id).collect();

        let specialties: Vec<SpecialtyRow> = sqlx::query_as(
            "SELECT trainer_id, specialty_name FROM trainer_specialties \
             WHERE trainer_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let windows: Vec<AvailabilityWindow> = sqlx::query_as(
            "SELECT * FROM trainer_availabilities WHERE trainer_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_trainer: HashMap<i32, &mut Trainer> =
            trainers.iter_mut().map(|t| (t.id, t)).collect();
        for row in specialties {
            if let Some(trainer) = by_trainer.get_mut(&row.trainer_id) {
                trainer.specialties.push(row.specialty_name);
            }
        }
        for window in windows {
            if let Some(trainer) = by_trainer.get_mut(&window.trainer_id) {
                trainer.availability.push(window);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ScheduleRepository for PgScheduleRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        let one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(one == 1)
    }

    async fn list_trainers(&self) -> RepositoryResult<Vec<Trainer>> {
        let mut trainers: Vec<Trainer> = sqlx::query_as("SELECT * FROM trainers ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        self.load_details(&mut trainers).await?;
        Ok(trainers)
    }

    async fn find_trainer(&self, trainer_id: i32) -> RepositoryResult<Option<Trainer>> {
        let trainer: Option<Trainer> = sqlx::query_as("SELECT * FROM trainers WHERE id = $1")
            .bind(trainer_id)
            .fetch_optional(&self.pool)
            .await?;
        match trainer {
            Some(trainer) => {
                let mut found = [trainer];
                self.load_details(&mut found).await?;
                let [trainer] = found;
                Ok(Some(trainer))
            }
            None => Ok(None),
        }
    }

    async fn availability_windows(
        &self,
        trainer_id: i32,
        day: DayOfWeek,
    ) -> RepositoryResult<Vec<AvailabilityWindow>> {
        let windows = sqlx::query_as(
            "SELECT * FROM trainer_availabilities \
             WHERE trainer_id = $1 AND day_of_week = $2 ORDER BY start_time",
        )
        .bind(trainer_id)
        .bind(day)
        .fetch_all(&self.pool)
        .await?;
        Ok(windows)
    }

    async fn find_service(&self, service_id: i32) -> RepositoryResult<Option<Service>> {
        let service = sqlx::query_as("SELECT * FROM services WHERE id = $1")
            .bind(service_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(service)
    }

    async fn list_services(&self, active_only: bool) -> RepositoryResult<Vec<Service>> {
        let services = sqlx::query_as(
            "SELECT * FROM services WHERE ($1 = FALSE OR is_active) ORDER BY id",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(services)
    }

    async fn appointments_on(
        &self,
        trainer_id: i32,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<Appointment>> {
        let appointments = sqlx::query_as(
            "SELECT * FROM appointments \
             WHERE trainer_id = $1 AND appointment_date = $2 ORDER BY start_time",
        )
        .bind(trainer_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(appointments)
    }

    async fn find_appointment(
        &self,
        appointment_id: i32,
    ) -> RepositoryResult<Option<Appointment>> {
        let appointment = sqlx::query_as("SELECT * FROM appointments WHERE id = $1")
            .bind(appointment_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(appointment)
    }

    async fn appointments_for_user(&self, user_id: &str) -> RepositoryResult<Vec<Appointment>> {
        let appointments = sqlx::query_as(
            "SELECT * FROM appointments WHERE user_id = $1 \
             ORDER BY appointment_date DESC, start_time DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(appointments)
    }

    async fn list_appointments(&self) -> RepositoryResult<Vec<Appointment>> {
        let appointments = sqlx::query_as(
            "SELECT * FROM appointments ORDER BY appointment_date DESC, start_time DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(appointments)
    }

    async fn insert_appointment(&self, new: &NewAppointment) -> RepositoryResult<Appointment> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(new.trainer_id)
            .bind(new.appointment_date.num_days_from_ce())
            .execute(&mut *tx)
            .await?;

        let clash: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT id FROM appointments
            WHERE trainer_id = $1
              AND appointment_date = $2
              AND status <> 'cancelled'
              AND start_time < $4
              AND end_time > $3
            LIMIT 1
            "#,
        )
        .bind(new.trainer_id)
        .bind(new.appointment_date)
        .bind(new.start_time)
        .bind(new.end_time)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(existing) = clash {
            debug!(
                "Overlap with appointment {} detected under lock for trainer {}",
                existing, new.trainer_id
            );
            return Err(RepositoryError::SlotConflict(format!(
                "trainer {} already booked on {} (appointment {})",
                new.trainer_id, new.appointment_date, existing
            )));
        }

        let appointment: Appointment = sqlx::query_as(
            r#"
            INSERT INTO appointments
                (user_id, trainer_id, service_id, appointment_date, start_time, end_time,
                 status, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8)
            RETURNING *
            "#,
        )
        .bind(&new.user_id)
        .bind(new.trainer_id)
        .bind(new.service_id)
        .bind(new.appointment_date)
        .bind(new.start_time)
        .bind(new.end_time)
        .bind(&new.notes)
        .bind(new.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(appointment)
    }

    async fn update_appointment_status(
        &self,
        appointment_id: i32,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> RepositoryResult<Option<Appointment>> {
        let appointment = sqlx::query_as(
            "UPDATE appointments SET status = $3 WHERE id = $1 AND status = $2 RETURNING *",
        )
        .bind(appointment_id)
        .bind(expected)
        .bind(next)
        .fetch_optional(&self.pool)
        .await?;
        Ok(appointment)
    }

    async fn appointments_in_month(
        &self,
        year: i32,
        month: u32,
    ) -> RepositoryResult<Vec<MonthlyAppointmentRow>> {
        let month = i32::try_from(month)
            .map_err(|_| RepositoryError::Validation(format!("month {} out of range", month)))?;
        let rows = sqlx::query_as(
            r#"
            SELECT a.status, s.name AS service_name, s.price
            FROM appointments a
            JOIN services s ON s.id = a.service_id
            WHERE EXTRACT(YEAR FROM a.appointment_date)::INT = $1
              AND EXTRACT(MONTH FROM a.appointment_date)::INT = $2
            "#,
        )
        .bind(year)
        .bind(month)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn trainer_statuses(&self) -> RepositoryResult<Vec<TrainerStatusRow>> {
        let rows = sqlx::query_as("SELECT trainer_id, status FROM appointments")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
