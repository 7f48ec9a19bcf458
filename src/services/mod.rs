// src/services/mod.rs
pub mod assignment_service;
pub mod attendance_service;
pub mod auth_service;
pub mod catalog_service;
pub mod conflict_service;
pub mod directory_service;
pub mod record_service;
pub mod schedule_service;
pub mod user_service;
pub mod verification_service;

#[cfg(test)]
pub(crate) mod test_fixtures;

use chrono::{Local, NaiveDateTime};

/// Hora local do servidor, usada como "agora" nas sessões e marcações.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
