// src/web/attendance_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        attendance::{
            AttendanceHistoryEntry, AttendanceRecordView, AttendanceSession, CheckInRequest,
            ManualMarkRequest, OpenSessionRequest, OpenedSession, QrPayloadResponse,
            ScheduleStats, SessionSummary, StudentAttendanceRecord,
        },
        ids::UserId,
    },
    services::{
        self, assignment_service, attendance_service, directory_service, record_service,
        schedule_service, user_service, verification_service,
    },
    state::AppState,
    web::mw_auth::CurrentUser,
};
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use sqlx::SqlitePool;

/// Staff do horário ou admin.
async fn ensure_schedule_staff(db_pool: &SqlitePool, schedule_id: i64, actor: UserId) -> AppResult<()> {
    let schedule = schedule_service::get_schedule(db_pool, schedule_id).await?;
    if assignment_service::authorize(db_pool, &schedule, actor).await?.is_some()
        || user_service::is_admin(db_pool, actor).await?
    {
        return Ok(());
    }
    Err(AppError::NotAuthorized(format!(
        "sem acesso às presenças do horário {}",
        schedule_id
    )))
}

/// Quem gere a sessão ou admin.
async fn ensure_session_access(
    db_pool: &SqlitePool,
    session: &AttendanceSession,
    actor: UserId,
) -> AppResult<()> {
    if user_service::is_admin(db_pool, actor).await? {
        return Ok(());
    }
    attendance_service::ensure_can_manage(db_pool, session, actor).await
}

/// POST /attendance/sessions
pub async fn open_session(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(req): Json<OpenSessionRequest>,
) -> AppResult<(StatusCode, Json<OpenedSession>)> {
    let opened = attendance_service::open_session(&state.db_pool, user_id, &req, services::now()).await?;
    Ok((StatusCode::CREATED, Json(opened)))
}

/// GET /attendance/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<AttendanceSession>> {
    let session = attendance_service::get_session(&state.db_pool, id).await?;
    ensure_session_access(&state.db_pool, &session, user_id).await?;
    Ok(Json(session))
}

/// POST /attendance/sessions/{id}/close
pub async fn close_session(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<AttendanceSession>> {
    Ok(Json(
        attendance_service::close_session(&state.db_pool, id, user_id, services::now()).await?,
    ))
}

/// POST /attendance/sessions/{id}/cancel
pub async fn cancel_session(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<AttendanceSession>> {
    Ok(Json(attendance_service::cancel_session(&state.db_pool, id, user_id).await?))
}

/// GET /attendance/sessions/{id}/qr
pub async fn session_qr(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<QrPayloadResponse>> {
    Ok(Json(
        attendance_service::qr_payload(&state.db_pool, id, user_id, &state.config.qr_namespace).await?,
    ))
}

/// POST /attendance/sessions/{id}/check-in
pub async fn check_in(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<CheckInRequest>,
) -> AppResult<Json<StudentAttendanceRecord>> {
    let record = verification_service::check_in_with_qr(
        &state.db_pool,
        &state.config.qr_namespace,
        id,
        user_id,
        &req.payload,
        services::now(),
    )
    .await?;
    Ok(Json(record))
}

/// POST /attendance/sessions/{id}/mark
pub async fn mark(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<ManualMarkRequest>,
) -> AppResult<Json<StudentAttendanceRecord>> {
    let record =
        verification_service::mark_manually(&state.db_pool, id, user_id, &req, services::now()).await?;
    Ok(Json(record))
}

/// GET /attendance/sessions/{id}/records
pub async fn session_records(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<AttendanceRecordView>>> {
    let session = attendance_service::get_session(&state.db_pool, id).await?;
    ensure_session_access(&state.db_pool, &session, user_id).await?;
    Ok(Json(record_service::list_records_for_session(&state.db_pool, id).await?))
}

/// GET /attendance/sessions/{id}/summary
pub async fn session_summary(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<SessionSummary>> {
    let session = attendance_service::get_session(&state.db_pool, id).await?;
    ensure_session_access(&state.db_pool, &session, user_id).await?;
    Ok(Json(record_service::session_summary(&state.db_pool, id).await?))
}

/// GET /attendance/schedules/{id}/sessions
pub async fn schedule_sessions(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(schedule_id): Path<i64>,
) -> AppResult<Json<Vec<AttendanceSession>>> {
    ensure_schedule_staff(&state.db_pool, schedule_id, user_id).await?;
    Ok(Json(
        attendance_service::list_for_schedule(&state.db_pool, schedule_id).await?,
    ))
}

/// GET /attendance/schedules/{id}/stats
pub async fn schedule_stats(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(schedule_id): Path<i64>,
) -> AppResult<Json<ScheduleStats>> {
    ensure_schedule_staff(&state.db_pool, schedule_id, user_id).await?;
    let schedule = schedule_service::get_schedule(&state.db_pool, schedule_id).await?;
    Ok(Json(record_service::schedule_stats(&state.db_pool, &schedule).await?))
}

/// GET /attendance/history
pub async fn my_history(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> AppResult<Json<Vec<AttendanceHistoryEntry>>> {
    let student = directory_service::find_student_by_user_id(&state.db_pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("aluno associado ao utilizador {}", user_id)))?;
    Ok(Json(
        record_service::history_for_student(&state.db_pool, student.id).await?,
    ))
}
