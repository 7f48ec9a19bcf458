// src/services/assignment_service.rs
// Quem pode dar aulas e fazer a chamada de um curso num período.
use crate::{
    error::{AppError, AppResult},
    models::{
        assignment::{AssignmentPayload, AssignmentQuery, AssistantAssignment, InstructorAssignment},
        attendance::OpenerRole,
        ids::UserId,
        schedule::CourseSchedule,
    },
    services::{catalog_service, directory_service},
};
use sqlx::SqlitePool;
use std::collections::BTreeSet;

const ASSIGNMENT_COLUMNS: &str = "id, course_id, academic_period_id, user_id, created_at";

/// Docente de um horário.
/// Um id explícito ganha sempre à tabela de atribuições, desde que exista no diretório;
/// sem id, usa a atribuição única de (curso, período).
pub async fn resolve_instructor(
    db_pool: &SqlitePool,
    course_id: i64,
    academic_period_id: i64,
    requested: Option<i64>,
) -> AppResult<UserId> {
    if let Some(key) = requested {
        return directory_service::resolve_lecturer_user(db_pool, key).await;
    }

    let assigned: Option<UserId> = sqlx::query_scalar(
        "SELECT user_id FROM instructor_assignments WHERE course_id = ?1 AND academic_period_id = ?2",
    )
    .bind(course_id)
    .bind(academic_period_id)
    .fetch_optional(db_pool)
    .await?;

    assigned.ok_or_else(|| {
        AppError::Validation(format!(
            "nenhum docente atribuído ao curso {} no período {}",
            course_id, academic_period_id
        ))
    })
}

pub async fn resolve_assistants(
    db_pool: &SqlitePool,
    course_id: i64,
    academic_period_id: i64,
) -> AppResult<BTreeSet<UserId>> {
    let rows: Vec<UserId> = sqlx::query_scalar(
        "SELECT user_id FROM assistant_assignments WHERE course_id = ?1 AND academic_period_id = ?2",
    )
    .bind(course_id)
    .bind(academic_period_id)
    .fetch_all(db_pool)
    .await?;
    Ok(rows.into_iter().collect())
}

/// Papel com que `actor` pode fazer a chamada deste horário, se algum.
pub async fn authorize(
    db_pool: &SqlitePool,
    schedule: &CourseSchedule,
    actor: UserId,
) -> AppResult<Option<OpenerRole>> {
    if actor == schedule.lecturer_id {
        return Ok(Some(OpenerRole::Instructor));
    }
    let assistants =
        resolve_assistants(db_pool, schedule.course_id, schedule.academic_period_id).await?;
    if assistants.contains(&actor) {
        return Ok(Some(OpenerRole::Assistant));
    }
    Ok(None)
}

/// Como `authorize`, mas a falta de papel é `NotAuthorized`.
pub async fn require_staff(
    db_pool: &SqlitePool,
    schedule: &CourseSchedule,
    actor: UserId,
) -> AppResult<OpenerRole> {
    authorize(db_pool, schedule, actor).await?.ok_or_else(|| {
        AppError::NotAuthorized(format!(
            "utilizador {} não é docente nem assistente do horário {}",
            actor, schedule.id
        ))
    })
}

struct ParsedAssignment {
    course_id: i64,
    academic_period_id: i64,
    user_id: UserId,
}

async fn parse_payload(db_pool: &SqlitePool, payload: &AssignmentPayload) -> AppResult<ParsedAssignment> {
    let parsed = ParsedAssignment {
        course_id: payload.course_id.parse("course_id")?,
        academic_period_id: payload.academic_period_id.parse("academic_period_id")?,
        user_id: payload.user_id.user_id("user_id")?,
    };
    if catalog_service::find_course(db_pool, parsed.course_id).await?.is_none() {
        return Err(AppError::NotFound(format!("curso {}", parsed.course_id)));
    }
    if catalog_service::find_period(db_pool, parsed.academic_period_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound(format!(
            "período {}",
            parsed.academic_period_id
        )));
    }
    Ok(parsed)
}

// --- Docentes ---

/// Um curso tem no máximo um docente por período.
pub async fn create_instructor_assignment(
    db_pool: &SqlitePool,
    payload: &AssignmentPayload,
) -> AppResult<InstructorAssignment> {
    let p = parse_payload(db_pool, payload).await?;

    let result = sqlx::query_as::<_, InstructorAssignment>(&format!(
        "INSERT INTO instructor_assignments (course_id, academic_period_id, user_id)
         VALUES (?1, ?2, ?3) RETURNING {}",
        ASSIGNMENT_COLUMNS
    ))
    .bind(p.course_id)
    .bind(p.academic_period_id)
    .bind(p.user_id)
    .fetch_one(db_pool)
    .await;

    match result {
        Ok(a) => {
            tracing::info!(
                "Docente {} atribuído ao curso {} (período {})",
                a.user_id,
                a.course_id,
                a.academic_period_id
            );
            Ok(a)
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(AppError::AlreadyExists(format!(
                "o curso {} já tem docente no período {}",
                p.course_id, p.academic_period_id
            )))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn list_instructor_assignments(
    db_pool: &SqlitePool,
    query: &AssignmentQuery,
) -> AppResult<Vec<InstructorAssignment>> {
    Ok(sqlx::query_as::<_, InstructorAssignment>(&format!(
        "SELECT {} FROM instructor_assignments
         WHERE (?1 IS NULL OR course_id = ?1) AND (?2 IS NULL OR academic_period_id = ?2)
         ORDER BY course_id, academic_period_id",
        ASSIGNMENT_COLUMNS
    ))
    .bind(query.course_id)
    .bind(query.academic_period_id)
    .fetch_all(db_pool)
    .await?)
}

pub async fn delete_instructor_assignment(db_pool: &SqlitePool, id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM instructor_assignments WHERE id = ?1")
        .bind(id)
        .execute(db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("atribuição de docente {}", id)));
    }
    tracing::info!("Atribuição de docente {} removida", id);
    Ok(())
}

// --- Assistentes ---

/// O par (utilizador, curso) é único, seja qual for o período.
pub async fn create_assistant_assignment(
    db_pool: &SqlitePool,
    payload: &AssignmentPayload,
) -> AppResult<AssistantAssignment> {
    let p = parse_payload(db_pool, payload).await?;

    let result = sqlx::query_as::<_, AssistantAssignment>(&format!(
        "INSERT INTO assistant_assignments (course_id, academic_period_id, user_id)
         VALUES (?1, ?2, ?3) RETURNING {}",
        ASSIGNMENT_COLUMNS
    ))
    .bind(p.course_id)
    .bind(p.academic_period_id)
    .bind(p.user_id)
    .fetch_one(db_pool)
    .await;

    match result {
        Ok(a) => {
            tracing::info!("Assistente {} atribuído ao curso {}", a.user_id, a.course_id);
            Ok(a)
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(AppError::AlreadyExists(format!(
                "o utilizador {} já é assistente do curso {}",
                p.user_id, p.course_id
            )))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn list_assistant_assignments(
    db_pool: &SqlitePool,
    query: &AssignmentQuery,
) -> AppResult<Vec<AssistantAssignment>> {
    Ok(sqlx::query_as::<_, AssistantAssignment>(&format!(
        "SELECT {} FROM assistant_assignments
         WHERE (?1 IS NULL OR course_id = ?1) AND (?2 IS NULL OR academic_period_id = ?2)
         ORDER BY course_id, user_id",
        ASSIGNMENT_COLUMNS
    ))
    .bind(query.course_id)
    .bind(query.academic_period_id)
    .fetch_all(db_pool)
    .await?)
}

pub async fn delete_assistant_assignment(db_pool: &SqlitePool, id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM assistant_assignments WHERE id = ?1")
        .bind(id)
        .execute(db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("atribuição de assistente {}", id)));
    }
    Ok(())
}
