// src/services/record_service.rs
// Registos de presença por (sessão, aluno) e estatísticas.
use crate::{
    error::AppResult,
    models::{
        attendance::{
            AttendanceHistoryEntry, AttendanceRecordView, AttendanceStatus, ScheduleStats,
            SessionSummary, StudentAttendanceRecord, VerificationMethod,
        },
        ids::UserId,
        schedule::CourseSchedule,
    },
    services::directory_service,
};
use chrono::NaiveDateTime;
use sqlx::{SqliteConnection, SqlitePool};

const RECORD_COLUMNS: &str =
    "id, session_id, student_id, status, check_in_time, verification_method, verified_by, notes";

const SUMMARY_COLUMNS: &str = "COUNT(*) AS total,
    COALESCE(SUM(status = 'PRESENT'), 0) AS present,
    COALESCE(SUM(status = 'LATE'), 0) AS late,
    COALESCE(SUM(status = 'ABSENT'), 0) AS absent,
    COALESCE(SUM(status = 'EXCUSED'), 0) AS excused";

/// Novo estado de um registo.
#[derive(Debug, Clone)]
pub struct RecordUpdate {
    pub status: AttendanceStatus,
    pub check_in_time: Option<NaiveDateTime>,
    pub verification_method: VerificationMethod,
    pub verified_by: Option<UserId>,
    pub notes: Option<String>,
}

/// Cria um registo ABSENT por aluno, dentro da transação de quem chama.
/// Falhas individuais ficam no log e não interrompem o resto.
pub async fn initialize_absent_records(
    conn: &mut SqliteConnection,
    session_id: i64,
    student_ids: &[i64],
) -> AppResult<usize> {
    let mut created = 0;
    for student_id in student_ids {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO student_attendances (session_id, student_id, status)
             VALUES (?1, ?2, 'ABSENT')",
        )
        .bind(session_id)
        .bind(student_id)
        .execute(&mut *conn)
        .await;

        match result {
            Ok(r) => created += r.rows_affected() as usize,
            Err(e) => tracing::warn!(
                "Sessão {}: falha ao iniciar registo do aluno {}: {}",
                session_id,
                student_id,
                e
            ),
        }
    }
    Ok(created)
}

/// Atualiza o registo existente ou cria-o; nunca há dois para o mesmo par.
pub async fn upsert_record(
    db_pool: &SqlitePool,
    session_id: i64,
    student_id: i64,
    update: &RecordUpdate,
) -> AppResult<StudentAttendanceRecord> {
    let record = sqlx::query_as::<_, StudentAttendanceRecord>(&format!(
        "INSERT INTO student_attendances
            (session_id, student_id, status, check_in_time, verification_method, verified_by, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (session_id, student_id) DO UPDATE SET
            status = excluded.status,
            check_in_time = excluded.check_in_time,
            verification_method = excluded.verification_method,
            verified_by = excluded.verified_by,
            notes = COALESCE(excluded.notes, student_attendances.notes),
            updated_at = CURRENT_TIMESTAMP
         RETURNING {}",
        RECORD_COLUMNS
    ))
    .bind(session_id)
    .bind(student_id)
    .bind(update.status)
    .bind(update.check_in_time)
    .bind(update.verification_method)
    .bind(update.verified_by)
    .bind(update.notes.as_deref())
    .fetch_one(db_pool)
    .await?;

    tracing::info!(
        "Sessão {}: aluno {} marcado {:?} ({:?})",
        session_id,
        student_id,
        record.status,
        update.verification_method
    );
    Ok(record)
}

pub async fn find_record(
    db_pool: &SqlitePool,
    session_id: i64,
    student_id: i64,
) -> AppResult<Option<StudentAttendanceRecord>> {
    Ok(sqlx::query_as::<_, StudentAttendanceRecord>(&format!(
        "SELECT {} FROM student_attendances WHERE session_id = ?1 AND student_id = ?2",
        RECORD_COLUMNS
    ))
    .bind(session_id)
    .bind(student_id)
    .fetch_optional(db_pool)
    .await?)
}

pub async fn list_records_for_session(
    db_pool: &SqlitePool,
    session_id: i64,
) -> AppResult<Vec<AttendanceRecordView>> {
    Ok(sqlx::query_as::<_, AttendanceRecordView>(
        "SELECT sa.id, sa.student_id, s.student_number, s.name AS student_name, sa.status,
                sa.check_in_time, sa.verification_method, sa.verified_by, sa.notes
         FROM student_attendances sa
         JOIN students s ON s.id = sa.student_id
         WHERE sa.session_id = ?1
         ORDER BY s.student_number",
    )
    .bind(session_id)
    .fetch_all(db_pool)
    .await?)
}

pub async fn session_summary(db_pool: &SqlitePool, session_id: i64) -> AppResult<SessionSummary> {
    Ok(sqlx::query_as::<_, SessionSummary>(&format!(
        "SELECT {} FROM student_attendances WHERE session_id = ?1",
        SUMMARY_COLUMNS
    ))
    .bind(session_id)
    .fetch_one(db_pool)
    .await?)
}

/// `(present + late) * 100 / (sessions * enrolled)`; 0 se algum denominador for zero.
pub fn average_attendance(present: i64, late: i64, sessions: i64, enrolled: i64) -> f64 {
    if sessions <= 0 || enrolled <= 0 {
        return 0.0;
    }
    (present + late) as f64 * 100.0 / (sessions * enrolled) as f64
}

/// Estatísticas de um horário sobre as sessões não canceladas.
pub async fn schedule_stats(db_pool: &SqlitePool, schedule: &CourseSchedule) -> AppResult<ScheduleStats> {
    let sessions: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM attendance_sessions WHERE course_schedule_id = ?1 AND status != 'CANCELED'",
    )
    .bind(schedule.id)
    .fetch_one(db_pool)
    .await?;

    let counts = sqlx::query_as::<_, SessionSummary>(&format!(
        "SELECT {} FROM student_attendances
         WHERE session_id IN (SELECT id FROM attendance_sessions
                              WHERE course_schedule_id = ?1 AND status != 'CANCELED')",
        SUMMARY_COLUMNS
    ))
    .bind(schedule.id)
    .fetch_one(db_pool)
    .await?;

    let enrolled = directory_service::count_members(db_pool, schedule.student_group_id).await?;

    Ok(ScheduleStats {
        course_schedule_id: schedule.id,
        sessions,
        enrolled,
        average_attendance: average_attendance(counts.present, counts.late, sessions, enrolled),
        counts,
    })
}

pub async fn history_for_student(
    db_pool: &SqlitePool,
    student_id: i64,
) -> AppResult<Vec<AttendanceHistoryEntry>> {
    Ok(sqlx::query_as::<_, AttendanceHistoryEntry>(
        "SELECT ses.id AS session_id, ses.course_schedule_id, c.code AS course_code,
                c.name AS course_name, ses.date, sa.status, sa.check_in_time, sa.verification_method
         FROM student_attendances sa
         JOIN attendance_sessions ses ON ses.id = sa.session_id
         JOIN course_schedules cs ON cs.id = ses.course_schedule_id
         JOIN courses c ON c.id = cs.course_id
         WHERE sa.student_id = ?1 AND ses.status != 'CANCELED'
         ORDER BY ses.date DESC, ses.start_time DESC",
    )
    .bind(student_id)
    .fetch_all(db_pool)
    .await?)
}
