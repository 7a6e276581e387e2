//! In-memory schedule store.
//!
//! Stores everything in `Vec`s behind a single `RwLock`, which makes the
//! overlap re-check and the insert in [`insert_appointment`] one atomic step.
//! Used by the test-suite and by the `memory` store backend.
//!
//! [`insert_appointment`]: ScheduleRepository::insert_appointment

use std::cmp::Reverse;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{Datelike, Local, NaiveDate, NaiveTime};

use super::{RepositoryError, RepositoryResult, ScheduleRepository};
use crate::models::{
    Appointment, AppointmentStatus, AvailabilityWindow, DayOfWeek, MonthlyAppointmentRow,
    NewAppointment, Service, Trainer, TrainerStatusRow,
};

#[derive(Clone, Default)]
pub struct MemoryScheduleRepository {
    data: Arc<RwLock<MemoryData>>,
}

#[derive(Default)]
struct MemoryData {
    trainers: Vec<Trainer>,
    services: Vec<Service>,
    appointments: Vec<Appointment>,

    next_trainer_id: i32,
    next_window_id: i32,
    next_service_id: i32,
    next_appointment_id: i32,

    unhealthy: bool,
}

impl MemoryData {
    fn trainer_mut(&mut self, trainer_id: i32) -> RepositoryResult<&mut Trainer> {
        self.trainers
            .iter_mut()
            .find(|t| t.id == trainer_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("trainer {}", trainer_id)))
    }

    fn service_mut(&mut self, service_id: i32) -> RepositoryResult<&mut Service> {
        self.services
            .iter_mut()
            .find(|s| s.id == service_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("service {}", service_id)))
    }
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

fn newest_first(appointments: &mut [Appointment]) {
    appointments.sort_by_key(|a| (Reverse(a.appointment_date), Reverse(a.start_time)));
}

impl MemoryScheduleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, MemoryData>> {
        let data = self
            .data
            .read()
            .map_err(|_| RepositoryError::Internal("memory store lock poisoned".into()))?;
        if data.unhealthy {
            return Err(RepositoryError::Connection("memory store marked unavailable".into()));
        }
        Ok(data)
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, MemoryData>> {
        let data = self
            .data
            .write()
            .map_err(|_| RepositoryError::Internal("memory store lock poisoned".into()))?;
        if data.unhealthy {
            return Err(RepositoryError::Connection("memory store marked unavailable".into()));
        }
        Ok(data)
    }

    /// Simulate losing (or regaining) the connection to the store.
    pub fn set_healthy(&self, healthy: bool) {
        match self.data.write() {
            Ok(mut data) => data.unhealthy = !healthy,
            Err(poisoned) => poisoned.into_inner().unhealthy = !healthy,
        }
    }

    // ==================== Seeding ====================

    pub fn add_trainer(
        &self,
        full_name: &str,
        email: &str,
        phone_number: Option<&str>,
        hourly_rate: BigDecimal,
    ) -> RepositoryResult<i32> {
        let mut data = self.write()?;
        if data.trainers.iter().any(|t| t.email == email) {
            return Err(RepositoryError::Validation(format!(
                "trainer email {} already registered",
                email
            )));
        }
        let id = next_id(&mut data.next_trainer_id);
        data.trainers.push(Trainer {
            id,
            full_name: full_name.to_string(),
            email: email.to_string(),
            phone_number: phone_number.map(str::to_string),
            bio: None,
            hourly_rate,
            created_at: Local::now().naive_local(),
            specialties: Vec::new(),
            availability: Vec::new(),
        });
        Ok(id)
    }

    pub fn add_specialty(&self, trainer_id: i32, specialty: &str) -> RepositoryResult<()> {
        let mut data = self.write()?;
        data.trainer_mut(trainer_id)?
            .specialties
            .push(specialty.to_string());
        Ok(())
    }

    pub fn add_window(
        &self,
        trainer_id: i32,
        day_of_week: DayOfWeek,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> RepositoryResult<i32> {
        let mut data = self.write()?;
        let id = next_id(&mut data.next_window_id);
        let window = AvailabilityWindow {
            id,
            trainer_id,
            day_of_week,
            start_time,
            end_time,
            is_active: true,
        };
        window.validate().map_err(RepositoryError::Validation)?;
        data.trainer_mut(trainer_id)?.availability.push(window);
        Ok(id)
    }

    pub fn set_window_active(&self, window_id: i32, active: bool) -> RepositoryResult<()> {
        let mut data = self.write()?;
        let window = data
            .trainers
            .iter_mut()
            .flat_map(|t| t.availability.iter_mut())
            .find(|w| w.id == window_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("availability window {}", window_id)))?;
        window.is_active = active;
        Ok(())
    }

    pub fn add_service(
        &self,
        name: &str,
        duration_minutes: i32,
        price: BigDecimal,
    ) -> RepositoryResult<i32> {
        let mut data = self.write()?;
        let id = data.next_service_id + 1;
        let service = Service {
            id,
            name: name.to_string(),
            description: None,
            duration_minutes,
            price,
            is_active: true,
        };
        service.validate().map_err(RepositoryError::Validation)?;
        data.next_service_id = id;
        data.services.push(service);
        Ok(id)
    }

    pub fn set_service_active(&self, service_id: i32, active: bool) -> RepositoryResult<()> {
        self.write()?.service_mut(service_id)?.is_active = active;
        Ok(())
    }

    pub fn set_service_duration(&self, service_id: i32, duration_minutes: i32) -> RepositoryResult<()> {
        let mut data = self.write()?;
        let service = data.service_mut(service_id)?;
        let mut edited = service.clone();
        edited.duration_minutes = duration_minutes;
        edited.validate().map_err(RepositoryError::Validation)?;
        *service = edited;
        Ok(())
    }
}

#[async_trait]
impl ScheduleRepository for MemoryScheduleRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.read().is_ok())
    }

    async fn list_trainers(&self) -> RepositoryResult<Vec<Trainer>> {
        Ok(self.read()?.trainers.clone())
    }

    async fn find_trainer(&self, trainer_id: i32) -> RepositoryResult<Option<Trainer>> {
        Ok(self.read()?.trainers.iter().find(|t| t.id == trainer_id).cloned())
    }

    async fn availability_windows(
        &self,
        trainer_id: i32,
        day: DayOfWeek,
    ) -> RepositoryResult<Vec<AvailabilityWindow>> {
        let data = self.read()?;
        Ok(data
            .trainers
            .iter()
            .filter(|t| t.id == trainer_id)
            .flat_map(|t| t.availability.iter())
            .filter(|w| w.day_of_week == day)
            .cloned()
            .collect())
    }

    async fn find_service(&self, service_id: i32) -> RepositoryResult<Option<Service>> {
        Ok(self.read()?.services.iter().find(|s| s.id == service_id).cloned())
    }

    async fn list_services(&self, active_only: bool) -> RepositoryResult<Vec<Service>> {
        Ok(self
            .read()?
            .services
            .iter()
            .filter(|s| !active_only || s.is_active)
            .cloned()
            .collect())
    }

    async fn appointments_on(
        &self,
        trainer_id: i32,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<Appointment>> {
        Ok(self
            .read()?
            .appointments
            .iter()
            .filter(|a| a.trainer_id == trainer_id && a.appointment_date == date)
            .cloned()
            .collect())
    }

    async fn find_appointment(
        &self,
        appointment_id: i32,
    ) -> RepositoryResult<Option<Appointment>> {
        Ok(self
            .read()?
            .appointments
            .iter()
            .find(|a| a.id == appointment_id)
            .cloned())
    }

    async fn appointments_for_user(&self, user_id: &str) -> RepositoryResult<Vec<Appointment>> {
        let mut found: Vec<Appointment> = self
            .read()?
            .appointments
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut found);
        Ok(found)
    }

    async fn list_appointments(&self) -> RepositoryResult<Vec<Appointment>> {
        let mut all = self.read()?.appointments.clone();
        newest_first(&mut all);
        Ok(all)
    }

    async fn insert_appointment(&self, new: &NewAppointment) -> RepositoryResult<Appointment> {
        let mut data = self.write()?;

        // Re-checked under the write lock so concurrent inserts serialize here.
        let clash = data.appointments.iter().find(|a| {
            a.trainer_id == new.trainer_id
                && a.appointment_date == new.appointment_date
                && a.status.occupies_slot()
                && a.overlaps(new.start_time, new.end_time)
        });
        if let Some(existing) = clash {
            return Err(RepositoryError::SlotConflict(format!(
                "trainer {} already booked {}-{} on {} (appointment {})",
                new.trainer_id,
                existing.start_time,
                existing.end_time,
                new.appointment_date,
                existing.id
            )));
        }

        let id = next_id(&mut data.next_appointment_id);
        let appointment = Appointment {
            id,
            user_id: new.user_id.clone(),
            trainer_id: new.trainer_id,
            service_id: new.service_id,
            appointment_date: new.appointment_date,
            start_time: new.start_time,
            end_time: new.end_time,
            status: AppointmentStatus::Pending,
            notes: new.notes.clone(),
            created_at: new.created_at,
        };
        data.appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn update_appointment_status(
        &self,
        appointment_id: i32,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> RepositoryResult<Option<Appointment>> {
        let mut data = self.write()?;
        let appointment = data
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment_id && a.status == expected);
        Ok(appointment.map(|a| {
            a.status = next;
            a.clone()
        }))
    }

    async fn appointments_in_month(
        &self,
        year: i32,
        month: u32,
    ) -> RepositoryResult<Vec<MonthlyAppointmentRow>> {
        let data = self.read()?;
        let rows = data
            .appointments
            .iter()
            .filter(|a| a.appointment_date.year() == year && a.appointment_date.month() == month)
            .filter_map(|a| {
                data.services
                    .iter()
                    .find(|s| s.id == a.service_id)
                    .map(|s| MonthlyAppointmentRow {
                        status: a.status,
                        service_name: s.name.clone(),
                        price: s.price.clone(),
                    })
            })
            .collect();
        Ok(rows)
    }

    async fn trainer_statuses(&self) -> RepositoryResult<Vec<TrainerStatusRow>> {
        Ok(self
            .read()?
            .appointments
            .iter()
            .map(|a| TrainerStatusRow {
                trainer_id: a.trainer_id,
                status: a.status,
            })
            .collect())
    }
}
