//! Demo gym for the memory store: four services and three trainers with
//! their weekly hours.

use bigdecimal::BigDecimal;
use chrono::NaiveTime;

use crate::models::DayOfWeek;
use crate::repository::{MemoryScheduleRepository, RepositoryError, RepositoryResult};

fn hour(h: u32) -> RepositoryResult<NaiveTime> {
    NaiveTime::from_hms_opt(h, 0, 0)
        .ok_or_else(|| RepositoryError::Validation(format!("invalid hour {}", h)))
}

pub fn demo_data(repo: &MemoryScheduleRepository) -> RepositoryResult<()> {
    repo.add_service("Yoga", 60, BigDecimal::from(200))?;
    repo.add_service("Pilates", 60, BigDecimal::from(250))?;
    repo.add_service("Fitness", 90, BigDecimal::from(300))?;
    repo.add_service("Kişisel Antrenman", 60, BigDecimal::from(400))?;

    let ahmet = repo.add_trainer(
        "Ahmet Yılmaz",
        "ahmet@gym.com",
        Some("555-0001"),
        BigDecimal::from(300),
    )?;
    repo.add_specialty(ahmet, "Kilo Verme")?;
    repo.add_specialty(ahmet, "Kas Yapma")?;
    for day in [DayOfWeek::Monday, DayOfWeek::Wednesday, DayOfWeek::Friday] {
        repo.add_window(ahmet, day, hour(9)?, hour(17)?)?;
    }

    let ayse = repo.add_trainer(
        "Ayşe Kara",
        "ayse@gym.com",
        Some("555-0002"),
        BigDecimal::from(250),
    )?;
    repo.add_specialty(ayse, "Yoga")?;
    repo.add_specialty(ayse, "Pilates")?;
    for day in [DayOfWeek::Tuesday, DayOfWeek::Thursday] {
        repo.add_window(ayse, day, hour(10)?, hour(18)?)?;
    }

    let mehmet = repo.add_trainer(
        "Mehmet Demir",
        "mehmet@gym.com",
        Some("555-0003"),
        BigDecimal::from(350),
    )?;
    repo.add_specialty(mehmet, "Kilo Verme")?;
    repo.add_specialty(mehmet, "Vücut Geliştirme")?;
    for day in DayOfWeek::ALL {
        repo.add_window(mehmet, day, hour(8)?, hour(16)?)?;
    }

    Ok(())
}
