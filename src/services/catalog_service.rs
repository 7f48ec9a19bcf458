// src/services/catalog_service.rs
// Stores mínimos de cursos, salas, períodos e turmas consumidos pelos horários.
use crate::{
    error::{AppError, AppResult},
    models::catalog::{
        AcademicPeriod, Course, NewAcademicPeriod, NewCourse, NewRoom, NewStudentGroup, Room,
        StudentGroup,
    },
};
use sqlx::SqlitePool;

/// Mapeia UNIQUE violado para `AlreadyExists`, o resto propaga.
fn map_insert_error(e: sqlx::Error, what: String) -> AppError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::AlreadyExists(what)
        }
        _ => e.into(),
    }
}

fn require_text(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} é obrigatório", field)));
    }
    Ok(())
}

// --- Cursos ---

pub async fn create_course(db_pool: &SqlitePool, new: &NewCourse) -> AppResult<Course> {
    require_text(&new.code, "code")?;
    require_text(&new.name, "name")?;
    let course = sqlx::query_as::<_, Course>(
        "INSERT INTO courses (code, name, credits) VALUES (?1, ?2, ?3)
         RETURNING id, code, name, credits",
    )
    .bind(new.code.trim())
    .bind(new.name.trim())
    .bind(new.credits)
    .fetch_one(db_pool)
    .await
    .map_err(|e| map_insert_error(e, format!("curso '{}'", new.code)))?;
    tracing::info!("Curso {} criado (id {}).", course.code, course.id);
    Ok(course)
}

pub async fn find_course(db_pool: &SqlitePool, id: i64) -> AppResult<Option<Course>> {
    Ok(
        sqlx::query_as::<_, Course>("SELECT id, code, name, credits FROM courses WHERE id = ?1")
            .bind(id)
            .fetch_optional(db_pool)
            .await?,
    )
}

pub async fn list_courses(db_pool: &SqlitePool) -> AppResult<Vec<Course>> {
    Ok(
        sqlx::query_as::<_, Course>("SELECT id, code, name, credits FROM courses ORDER BY code")
            .fetch_all(db_pool)
            .await?,
    )
}

// --- Salas ---

pub async fn create_room(db_pool: &SqlitePool, new: &NewRoom) -> AppResult<Room> {
    require_text(&new.code, "code")?;
    require_text(&new.name, "name")?;
    if new.capacity < 0 {
        return Err(AppError::Validation("capacity não pode ser negativa".into()));
    }
    let room = sqlx::query_as::<_, Room>(
        "INSERT INTO rooms (code, name, building, capacity) VALUES (?1, ?2, ?3, ?4)
         RETURNING id, code, name, building, capacity",
    )
    .bind(new.code.trim())
    .bind(new.name.trim())
    .bind(new.building.as_deref())
    .bind(new.capacity)
    .fetch_one(db_pool)
    .await
    .map_err(|e| map_insert_error(e, format!("sala '{}'", new.code)))?;
    Ok(room)
}

pub async fn find_room(db_pool: &SqlitePool, id: i64) -> AppResult<Option<Room>> {
    Ok(sqlx::query_as::<_, Room>(
        "SELECT id, code, name, building, capacity FROM rooms WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(db_pool)
    .await?)
}

pub async fn list_rooms(db_pool: &SqlitePool) -> AppResult<Vec<Room>> {
    Ok(sqlx::query_as::<_, Room>(
        "SELECT id, code, name, building, capacity FROM rooms ORDER BY code",
    )
    .fetch_all(db_pool)
    .await?)
}

// --- Períodos académicos ---

pub async fn create_period(db_pool: &SqlitePool, new: &NewAcademicPeriod) -> AppResult<AcademicPeriod> {
    require_text(&new.name, "name")?;
    require_text(&new.term, "term")?;
    let period = sqlx::query_as::<_, AcademicPeriod>(
        "INSERT INTO academic_periods (name, year, term, is_active) VALUES (?1, ?2, ?3, ?4)
         RETURNING id, name, year, term, is_active",
    )
    .bind(new.name.trim())
    .bind(new.year)
    .bind(new.term.trim())
    .bind(new.is_active)
    .fetch_one(db_pool)
    .await
    .map_err(|e| map_insert_error(e, format!("período {} {}", new.year, new.term)))?;
    Ok(period)
}

pub async fn find_period(db_pool: &SqlitePool, id: i64) -> AppResult<Option<AcademicPeriod>> {
    Ok(sqlx::query_as::<_, AcademicPeriod>(
        "SELECT id, name, year, term, is_active FROM academic_periods WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(db_pool)
    .await?)
}

pub async fn list_periods(db_pool: &SqlitePool) -> AppResult<Vec<AcademicPeriod>> {
    Ok(sqlx::query_as::<_, AcademicPeriod>(
        "SELECT id, name, year, term, is_active FROM academic_periods ORDER BY year DESC, term",
    )
    .fetch_all(db_pool)
    .await?)
}

// --- Turmas ---

pub async fn create_group(db_pool: &SqlitePool, new: &NewStudentGroup) -> AppResult<StudentGroup> {
    require_text(&new.name, "name")?;
    let group = sqlx::query_as::<_, StudentGroup>(
        "INSERT INTO student_groups (name, program, semester) VALUES (?1, ?2, ?3)
         RETURNING id, name, program, semester",
    )
    .bind(new.name.trim())
    .bind(new.program.as_deref())
    .bind(new.semester)
    .fetch_one(db_pool)
    .await
    .map_err(|e| map_insert_error(e, format!("turma '{}'", new.name)))?;
    Ok(group)
}

pub async fn find_group(db_pool: &SqlitePool, id: i64) -> AppResult<Option<StudentGroup>> {
    Ok(sqlx::query_as::<_, StudentGroup>(
        "SELECT id, name, program, semester FROM student_groups WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(db_pool)
    .await?)
}

pub async fn list_groups(db_pool: &SqlitePool) -> AppResult<Vec<StudentGroup>> {
    Ok(sqlx::query_as::<_, StudentGroup>(
        "SELECT id, name, program, semester FROM student_groups ORDER BY name",
    )
    .fetch_all(db_pool)
    .await?)
}
