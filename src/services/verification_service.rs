// src/services/verification_service.rs
// Validação das marcações (QR do aluno ou manual pelo staff) antes de gravar.
use crate::{
    error::{AppError, AppResult},
    models::{
        attendance::{
            AttendanceSession, AttendanceStatus, ManualMarkRequest, StudentAttendanceRecord,
            VerificationMethod,
        },
        ids::UserId,
    },
    services::{
        assignment_service, attendance_service, directory_service,
        record_service::{self, RecordUpdate},
        schedule_service,
    },
};
use chrono::{Duration, NaiveDateTime};
use sqlx::SqlitePool;

/// PRESENT, ou LATE quando a sessão aceita atrasos e já passaram mais de
/// `late_threshold_minutes` desde a abertura.
pub fn classify_check_in(session: &AttendanceSession, now: NaiveDateTime) -> AttendanceStatus {
    if session.allow_late && now - session.start_time > Duration::minutes(session.late_threshold_minutes) {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    }
}

fn payload_matches(session: &AttendanceSession, namespace: &str, payload: &str) -> bool {
    let payload = payload.trim();
    session.qr_payload.as_deref() == Some(payload)
        || payload == attendance_service::legacy_payload(namespace, session.id)
}

async fn active_session(db_pool: &SqlitePool, session_id: i64) -> AppResult<AttendanceSession> {
    let session = attendance_service::get_session(db_pool, session_id).await?;
    if !session.is_active() {
        return Err(AppError::SessionNotActive);
    }
    Ok(session)
}

/// O aluno tem de pertencer à turma do horário da sessão.
async fn ensure_enrolled(db_pool: &SqlitePool, session: &AttendanceSession, student_id: i64) -> AppResult<()> {
    let schedule = schedule_service::get_schedule(db_pool, session.course_schedule_id).await?;
    if !directory_service::is_member(db_pool, schedule.student_group_id, student_id).await? {
        tracing::warn!(
            "Aluno {} tentou marcar presença na sessão {} sem pertencer à turma {}",
            student_id,
            session.id,
            schedule.student_group_id
        );
        return Err(AppError::NotEnrolled);
    }
    Ok(())
}

/// Check-in do próprio aluno com o payload lido do QR code.
pub async fn check_in_with_qr(
    db_pool: &SqlitePool,
    namespace: &str,
    session_id: i64,
    actor: UserId,
    payload: &str,
    now: NaiveDateTime,
) -> AppResult<StudentAttendanceRecord> {
    let session = active_session(db_pool, session_id).await?;
    if !session.verification_type.includes_qr() {
        return Err(AppError::Validation(format!(
            "a sessão {} não aceita QR code",
            session_id
        )));
    }
    if !payload_matches(&session, namespace, payload) {
        tracing::warn!("QR inválido na sessão {} (utilizador {})", session_id, actor);
        return Err(AppError::InvalidQrPayload);
    }

    let student = directory_service::find_student_by_user_id(db_pool, actor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("aluno associado ao utilizador {}", actor)))?;
    ensure_enrolled(db_pool, &session, student.id).await?;

    let update = RecordUpdate {
        status: classify_check_in(&session, now),
        check_in_time: Some(now),
        verification_method: VerificationMethod::QrCode,
        verified_by: None,
        notes: None,
    };
    record_service::upsert_record(db_pool, session.id, student.id, &update).await
}

/// Marcação manual por docente ou assistente autorizado.
pub async fn mark_manually(
    db_pool: &SqlitePool,
    session_id: i64,
    actor: UserId,
    req: &ManualMarkRequest,
    now: NaiveDateTime,
) -> AppResult<StudentAttendanceRecord> {
    let session = active_session(db_pool, session_id).await?;
    let schedule = schedule_service::get_schedule(db_pool, session.course_schedule_id).await?;
    assignment_service::require_staff(db_pool, &schedule, actor).await?;

    let student_id = req.student_id.parse("student_id")?;
    if directory_service::find_student_by_id(db_pool, student_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound(format!("aluno {}", student_id)));
    }
    ensure_enrolled(db_pool, &session, student_id).await?;

    // LATE explícito é decisão do staff e não depende de allow_late.
    // ABSENT e EXCUSED ficam como pedidos e sem hora de entrada
    let (status, check_in_time) = match req.status.unwrap_or(AttendanceStatus::Present) {
        AttendanceStatus::Present => (classify_check_in(&session, now), Some(now)),
        AttendanceStatus::Late => (AttendanceStatus::Late, Some(now)),
        other => (other, None),
    };

    let update = RecordUpdate {
        status,
        check_in_time,
        verification_method: VerificationMethod::Manual,
        verified_by: Some(actor),
        notes: req.notes.clone(),
    };
    record_service::upsert_record(db_pool, session.id, student_id, &update).await
}
