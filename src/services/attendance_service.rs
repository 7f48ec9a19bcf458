// src/services/attendance_service.rs
// Ciclo de vida das sessões de presença: abrir, fechar, cancelar e fecho automático.
use crate::{
    error::{AppError, AppResult},
    models::{
        attendance::{
            AttendanceSession, OpenSessionRequest, OpenedSession, OpenerRole, QrPayloadResponse,
            SessionSettings, VerificationType,
        },
        ids::UserId,
        schedule::{CourseSchedule, Day},
    },
    services::{assignment_service, directory_service, record_service, schedule_service},
};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;
use uuid::Uuid;

const SESSION_COLUMNS: &str = "id, course_schedule_id, opened_by, opener_role, date, start_time, \
     end_time, verification_type, status, auto_close, duration_minutes, allow_late, \
     late_threshold_minutes, notes, qr_payload, created_at";

/// Tentativas de abertura quando o índice de sessão ativa apanha uma corrida.
const OPEN_ATTEMPTS: usize = 2;

/// Payload antigo, aceite por compatibilidade: `<namespace>:attendance:<id>`.
pub fn legacy_payload(namespace: &str, session_id: i64) -> String {
    format!("{}:attendance:{}", namespace, session_id)
}

fn new_qr_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Decide se `actor` (com o papel `role`) pode abrir uma sessão dadas as sessões
/// ACTIVE já existentes para o mesmo horário e data.
///
/// O docente pode abrir por cima de uma sessão de assistente; o contrário não.
pub fn arbitrate(active: &[AttendanceSession], actor: UserId, role: OpenerRole) -> AppResult<()> {
    if let Some(own) = active.iter().find(|s| s.opened_by == actor) {
        return Err(AppError::DuplicateActiveSession { role: own.opener_role });
    }
    if role == OpenerRole::Assistant
        && active.iter().any(|s| s.opener_role == OpenerRole::Instructor)
    {
        return Err(AppError::InstructorSessionExists);
    }
    if active.iter().any(|s| s.opener_role == role) {
        return Err(AppError::DuplicateActiveSession { role });
    }
    Ok(())
}

fn validate_settings(settings: &SessionSettings) -> AppResult<()> {
    if settings.duration <= 0 {
        return Err(AppError::Validation("duration tem de ser positiva".into()));
    }
    if settings.late_threshold < 0 {
        return Err(AppError::Validation("lateThreshold não pode ser negativo".into()));
    }
    Ok(())
}

fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("data inválida (esperado YYYY-MM-DD): {:?}", raw)))
}

// --- Leitura ---

pub async fn find_session(db_pool: &SqlitePool, id: i64) -> AppResult<Option<AttendanceSession>> {
    Ok(sqlx::query_as::<_, AttendanceSession>(&format!(
        "SELECT {} FROM attendance_sessions WHERE id = ?1",
        SESSION_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db_pool)
    .await?)
}

pub async fn get_session(db_pool: &SqlitePool, id: i64) -> AppResult<AttendanceSession> {
    find_session(db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("sessão de presença {}", id)))
}

pub async fn list_active_for(
    db_pool: &SqlitePool,
    course_schedule_id: i64,
    date: NaiveDate,
) -> AppResult<Vec<AttendanceSession>> {
    Ok(sqlx::query_as::<_, AttendanceSession>(&format!(
        "SELECT {} FROM attendance_sessions
         WHERE course_schedule_id = ?1 AND date = ?2 AND status = 'ACTIVE'",
        SESSION_COLUMNS
    ))
    .bind(course_schedule_id)
    .bind(date)
    .fetch_all(db_pool)
    .await?)
}

pub async fn list_for_schedule(
    db_pool: &SqlitePool,
    course_schedule_id: i64,
) -> AppResult<Vec<AttendanceSession>> {
    Ok(sqlx::query_as::<_, AttendanceSession>(&format!(
        "SELECT {} FROM attendance_sessions WHERE course_schedule_id = ?1
         ORDER BY date DESC, start_time DESC",
        SESSION_COLUMNS
    ))
    .bind(course_schedule_id)
    .fetch_all(db_pool)
    .await?)
}

/// Quem abriu a sessão ou quem passa a autorização do horário.
pub async fn ensure_can_manage(
    db_pool: &SqlitePool,
    session: &AttendanceSession,
    actor: UserId,
) -> AppResult<()> {
    if session.opened_by == actor {
        return Ok(());
    }
    let schedule = schedule_service::get_schedule(db_pool, session.course_schedule_id).await?;
    assignment_service::require_staff(db_pool, &schedule, actor).await?;
    Ok(())
}

// --- Abertura ---

struct NewSession<'a> {
    schedule_id: i64,
    opened_by: UserId,
    role: OpenerRole,
    date: NaiveDate,
    start_time: NaiveDateTime,
    verification_type: VerificationType,
    settings: &'a SessionSettings,
    qr_payload: Option<String>,
}

/// Insere a sessão e os registos ABSENT numa só transação.
async fn insert_session(
    db_pool: &SqlitePool,
    new: &NewSession<'_>,
    roster: &[i64],
) -> AppResult<(AttendanceSession, usize)> {
    let mut tx = db_pool.begin().await?;

    let session = sqlx::query_as::<_, AttendanceSession>(&format!(
        "INSERT INTO attendance_sessions
            (course_schedule_id, opened_by, opener_role, date, start_time, verification_type,
             status, auto_close, duration_minutes, allow_late, late_threshold_minutes, notes, qr_payload)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'ACTIVE', ?7, ?8, ?9, ?10, ?11, ?12)
         RETURNING {}",
        SESSION_COLUMNS
    ))
    .bind(new.schedule_id)
    .bind(new.opened_by)
    .bind(new.role)
    .bind(new.date)
    .bind(new.start_time)
    .bind(new.verification_type)
    .bind(new.settings.auto_close)
    .bind(new.settings.duration)
    .bind(new.settings.allow_late)
    .bind(new.settings.late_threshold)
    .bind(new.settings.notes.as_deref())
    .bind(new.qr_payload.as_deref())
    .fetch_one(&mut *tx)
    .await?;

    let initialized = record_service::initialize_absent_records(&mut *tx, session.id, roster).await?;
    tx.commit().await?;
    Ok((session, initialized))
}

/// Abre uma sessão de presença para um horário numa data.
pub async fn open_session(
    db_pool: &SqlitePool,
    actor: UserId,
    req: &OpenSessionRequest,
    now: NaiveDateTime,
) -> AppResult<OpenedSession> {
    let schedule_id = req.course_schedule_id.parse("course_schedule_id")?;
    let date = parse_date(&req.date)?;
    if req.verification_type == VerificationType::FaceRecognition {
        return Err(AppError::Validation(
            "verificação por reconhecimento facial não é suportada".into(),
        ));
    }
    validate_settings(&req.settings)?;

    let schedule = schedule_service::get_schedule(db_pool, schedule_id).await?;
    let role = assignment_service::require_staff(db_pool, &schedule, actor).await?;
    warn_on_day_mismatch(&schedule, date);

    let roster = directory_service::list_group_student_ids(db_pool, schedule.student_group_id).await?;
    let new = NewSession {
        schedule_id,
        opened_by: actor,
        role,
        date,
        start_time: now,
        verification_type: req.verification_type,
        settings: &req.settings,
        qr_payload: req.verification_type.includes_qr().then(new_qr_token),
    };

    for attempt in 1..=OPEN_ATTEMPTS {
        let active = list_active_for(db_pool, schedule_id, date).await?;
        arbitrate(&active, actor, role)?;

        match insert_session(db_pool, &new, &roster).await {
            Ok((session, records_initialized)) => {
                tracing::info!(
                    "Sessão {} aberta por {} ({}) para o horário {} em {}: {} registos ABSENT",
                    session.id,
                    actor,
                    role,
                    schedule_id,
                    date,
                    records_initialized
                );
                let qr_payload = session.qr_payload.clone();
                return Ok(OpenedSession {
                    session,
                    qr_payload,
                    records_initialized,
                });
            }
            Err(e) if e.is_unique_violation() && attempt < OPEN_ATTEMPTS => {
                tracing::warn!(
                    "Abertura concorrente no horário {} em {}; a reavaliar",
                    schedule_id,
                    date
                );
            }
            Err(e) if e.is_unique_violation() => {
                return Err(AppError::DuplicateActiveSession { role });
            }
            Err(e) => return Err(e),
        }
    }
    Err(AppError::DuplicateActiveSession { role })
}

fn warn_on_day_mismatch(schedule: &CourseSchedule, date: NaiveDate) {
    let day = Day::from_weekday(date.weekday());
    if day != schedule.day {
        tracing::warn!(
            "Sessão para o horário {} ({}) aberta numa {} ({})",
            schedule.id,
            schedule.day,
            day,
            date
        );
    }
}

// --- Transições ---

/// ACTIVE -> CLOSED. Permitido a quem abriu ou a staff autorizado do horário.
pub async fn close_session(
    db_pool: &SqlitePool,
    session_id: i64,
    actor: UserId,
    now: NaiveDateTime,
) -> AppResult<AttendanceSession> {
    let session = get_session(db_pool, session_id).await?;
    ensure_can_manage(db_pool, &session, actor).await?;
    if !session.is_active() {
        return Err(AppError::SessionNotActive);
    }

    let closed = sqlx::query_as::<_, AttendanceSession>(&format!(
        "UPDATE attendance_sessions SET status = 'CLOSED', end_time = ?1
         WHERE id = ?2 AND status = 'ACTIVE' RETURNING {}",
        SESSION_COLUMNS
    ))
    .bind(now)
    .bind(session_id)
    .fetch_optional(db_pool)
    .await?
    .ok_or(AppError::SessionNotActive)?;

    tracing::info!("Sessão {} fechada por {}", session_id, actor);
    Ok(closed)
}

/// ACTIVE -> CANCELED. Só quem abriu pode cancelar; não há end_time.
pub async fn cancel_session(
    db_pool: &SqlitePool,
    session_id: i64,
    actor: UserId,
) -> AppResult<AttendanceSession> {
    let session = get_session(db_pool, session_id).await?;
    if session.opened_by != actor {
        return Err(AppError::NotAuthorized(format!(
            "só quem abriu a sessão {} a pode cancelar",
            session_id
        )));
    }
    if !session.is_active() {
        return Err(AppError::SessionNotActive);
    }

    let canceled = sqlx::query_as::<_, AttendanceSession>(&format!(
        "UPDATE attendance_sessions SET status = 'CANCELED'
         WHERE id = ?1 AND status = 'ACTIVE' RETURNING {}",
        SESSION_COLUMNS
    ))
    .bind(session_id)
    .fetch_optional(db_pool)
    .await?
    .ok_or(AppError::SessionNotActive)?;

    tracing::info!("Sessão {} cancelada por {}", session_id, actor);
    Ok(canceled)
}

/// Payload do QR (o token e o formato antigo) para quem gere a sessão.
pub async fn qr_payload(
    db_pool: &SqlitePool,
    session_id: i64,
    actor: UserId,
    namespace: &str,
) -> AppResult<QrPayloadResponse> {
    let session = get_session(db_pool, session_id).await?;
    ensure_can_manage(db_pool, &session, actor).await?;
    if !session.verification_type.includes_qr() {
        return Err(AppError::Validation(format!(
            "a sessão {} não usa QR code",
            session_id
        )));
    }
    Ok(QrPayloadResponse {
        session_id,
        payload: session.qr_payload,
        legacy_payload: legacy_payload(namespace, session_id),
    })
}

/// Fecha as sessões ACTIVE com auto_close cujo `start_time + duration` já passou.
/// O end_time fica no fim previsto, não no momento da varredura.
pub async fn close_expired_sessions(db_pool: &SqlitePool, now: NaiveDateTime) -> AppResult<Vec<i64>> {
    let candidates = sqlx::query_as::<_, AttendanceSession>(&format!(
        "SELECT {} FROM attendance_sessions WHERE status = 'ACTIVE' AND auto_close = 1",
        SESSION_COLUMNS
    ))
    .fetch_all(db_pool)
    .await?;

    let expired: Vec<&AttendanceSession> = candidates
        .iter()
        .filter(|s| s.scheduled_end() <= now)
        .collect();
    if expired.is_empty() {
        return Ok(Vec::new());
    }

    let mut tx = db_pool.begin().await?;
    let mut closed = Vec::with_capacity(expired.len());
    for session in expired {
        let result = sqlx::query(
            "UPDATE attendance_sessions SET status = 'CLOSED', end_time = ?1
             WHERE id = ?2 AND status = 'ACTIVE'",
        )
        .bind(session.scheduled_end())
        .bind(session.id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() > 0 {
            closed.push(session.id);
        }
    }
    tx.commit().await?;

    tracing::info!("Fecho automático: {} sessão(ões) fechadas {:?}", closed.len(), closed);
    Ok(closed)
}
