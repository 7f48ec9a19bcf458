// src/web/schedule_handlers.rs
use crate::{
    error::AppResult,
    models::schedule::{
        ConflictCheckRequest, ConflictReport, CourseSchedule, ScheduleDetail, ScheduleQuery,
        ScheduleRequest, ScheduleWithConflicts,
    },
    services::{directory_service, schedule_service},
    state::AppState,
    web::mw_auth::CurrentUser,
};
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

/// GET /schedules?course_id=|student_group_id=|room_id=|lecturer_id=
pub async fn list_schedules(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> AppResult<Json<Vec<CourseSchedule>>> {
    Ok(Json(schedule_service::list_filtered(&state.db_pool, &query).await?))
}

/// GET /schedules/mine
/// Docente/assistente: horários que pode gerir. Aluno: horários das suas turmas.
pub async fn my_schedules(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> AppResult<Json<Vec<CourseSchedule>>> {
    let mut schedules = schedule_service::list_for_staff(&state.db_pool, user_id).await?;

    if let Some(student) = directory_service::find_student_by_user_id(&state.db_pool, user_id).await? {
        for schedule in schedule_service::list_for_student(&state.db_pool, student.id).await? {
            if !schedules.iter().any(|s| s.id == schedule.id) {
                schedules.push(schedule);
            }
        }
    }
    Ok(Json(schedules))
}

/// GET /schedules/{id}
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ScheduleDetail>> {
    Ok(Json(schedule_service::schedule_detail(&state.db_pool, id).await?))
}

// --- Admin ---

/// POST /admin/schedules
pub async fn create_schedule(
    State(state): State<AppState>,
    Json(req): Json<ScheduleRequest>,
) -> AppResult<(StatusCode, Json<ScheduleWithConflicts>)> {
    let created = schedule_service::create_schedule(&state.db_pool, &req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /admin/schedules/{id}
pub async fn update_schedule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ScheduleRequest>,
) -> AppResult<Json<ScheduleWithConflicts>> {
    Ok(Json(schedule_service::update_schedule(&state.db_pool, id, &req).await?))
}

/// DELETE /admin/schedules/{id}
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    schedule_service::delete_schedule(&state.db_pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/schedules/check-conflicts
pub async fn check_conflicts(
    State(state): State<AppState>,
    Json(req): Json<ConflictCheckRequest>,
) -> AppResult<Json<ConflictReport>> {
    Ok(Json(schedule_service::check_conflicts(&state.db_pool, &req).await?))
}
