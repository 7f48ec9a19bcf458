// src/models/attendance.rs
use crate::models::ids::{RawId, UserId};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

pub const DEFAULT_AUTO_CLOSE: bool = true;
pub const DEFAULT_DURATION_MINUTES: i64 = 15;
pub const DEFAULT_ALLOW_LATE: bool = true;
pub const DEFAULT_LATE_THRESHOLD_MINUTES: i64 = 10;

// --- Enumerações guardadas como TEXT ---

/// Papel de quem abriu a sessão.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpenerRole {
    Instructor,
    Assistant,
}

impl fmt::Display for OpenerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenerRole::Instructor => f.write_str("INSTRUCTOR"),
            OpenerRole::Assistant => f.write_str("ASSISTANT"),
        }
    }
}

/// ACTIVE -> CLOSED e ACTIVE -> CANCELED; os dois últimos são terminais.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Active,
    Closed,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationType {
    QrCode,
    /// Existe no protocolo mas não é suportado: abrir uma sessão com este tipo falha.
    FaceRecognition,
    Manual,
    Both,
}

impl VerificationType {
    pub fn includes_qr(&self) -> bool {
        matches!(self, VerificationType::QrCode | VerificationType::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Excused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationMethod {
    QrCode,
    Manual,
}

// --- Sessão de presença ---

/// Parâmetros da sessão enviados por quem a abre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    pub auto_close: bool,
    /// Minutos.
    pub duration: i64,
    pub allow_late: bool,
    /// Minutos após o início a partir dos quais a entrada conta como LATE.
    pub late_threshold: i64,
    pub notes: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            auto_close: DEFAULT_AUTO_CLOSE,
            duration: DEFAULT_DURATION_MINUTES,
            allow_late: DEFAULT_ALLOW_LATE,
            late_threshold: DEFAULT_LATE_THRESHOLD_MINUTES,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenSessionRequest {
    pub course_schedule_id: RawId,
    #[serde(rename = "type")]
    pub verification_type: VerificationType,
    /// YYYY-MM-DD
    pub date: String,
    #[serde(default)]
    pub settings: SessionSettings,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AttendanceSession {
    pub id: i64,
    pub course_schedule_id: i64,
    pub opened_by: UserId,
    pub opener_role: OpenerRole,
    pub date: NaiveDate,
    pub start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    pub verification_type: VerificationType,
    pub status: SessionStatus,
    pub auto_close: bool,
    pub duration_minutes: i64,
    pub allow_late: bool,
    pub late_threshold_minutes: i64,
    pub notes: Option<String>,
    #[serde(skip_serializing)]
    pub qr_payload: Option<String>,
    pub created_at: NaiveDateTime,
}

impl AttendanceSession {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Momento em que o fecho automático deve acontecer (`start_time + duration`).
    pub fn scheduled_end(&self) -> NaiveDateTime {
        self.start_time + Duration::minutes(self.duration_minutes)
    }
}

/// Resposta de abertura: a sessão, o payload do QR (só para quem abriu) e
/// quantos registos ABSENT foram criados.
#[derive(Debug, Clone, Serialize)]
pub struct OpenedSession {
    pub session: AttendanceSession,
    pub qr_payload: Option<String>,
    pub records_initialized: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QrPayloadResponse {
    pub session_id: i64,
    pub payload: Option<String>,
    pub legacy_payload: String,
}

// --- Registos por aluno ---

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentAttendanceRecord {
    pub id: i64,
    pub session_id: i64,
    pub student_id: i64,
    pub status: AttendanceStatus,
    pub check_in_time: Option<NaiveDateTime>,
    pub verification_method: Option<VerificationMethod>,
    pub verified_by: Option<UserId>,
    pub notes: Option<String>,
}

/// Registo com número e nome do aluno, para listagens da sessão.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AttendanceRecordView {
    pub id: i64,
    pub student_id: i64,
    pub student_number: String,
    pub student_name: String,
    pub status: AttendanceStatus,
    pub check_in_time: Option<NaiveDateTime>,
    pub verification_method: Option<VerificationMethod>,
    pub verified_by: Option<UserId>,
    pub notes: Option<String>,
}

/// Linha do histórico de um aluno.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AttendanceHistoryEntry {
    pub session_id: i64,
    pub course_schedule_id: i64,
    pub course_code: String,
    pub course_name: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in_time: Option<NaiveDateTime>,
    pub verification_method: Option<VerificationMethod>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct SessionSummary {
    pub total: i64,
    pub present: i64,
    pub late: i64,
    pub absent: i64,
    pub excused: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleStats {
    pub course_schedule_id: i64,
    pub sessions: i64,
    pub enrolled: i64,
    #[serde(flatten)]
    pub counts: SessionSummary,
    /// `(present + late) * 100 / (sessions * enrolled)`, ou 0 sem denominador.
    pub average_attendance: f64,
}

// --- Pedidos de marcação ---

#[derive(Debug, Clone, Deserialize)]
pub struct CheckInRequest {
    pub payload: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManualMarkRequest {
    pub student_id: RawId,
    pub status: Option<AttendanceStatus>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_fill_defaults() {
        let s: SessionSettings = serde_json::from_value(json!({ "duration": 30 })).unwrap();
        assert_eq!(s.duration, 30);
        assert!(s.auto_close);
        assert!(s.allow_late);
        assert_eq!(s.late_threshold, 10);

        let req: OpenSessionRequest = serde_json::from_value(json!({
            "course_schedule_id": "12",
            "type": "BOTH",
            "date": "2025-10-06"
        }))
        .unwrap();
        assert_eq!(req.settings, SessionSettings::default());
        assert!(req.verification_type.includes_qr());
    }

    #[test]
    fn only_qr_and_both_include_qr() {
        assert!(VerificationType::QrCode.includes_qr());
        assert!(VerificationType::Both.includes_qr());
        assert!(!VerificationType::Manual.includes_qr());
        assert!(!VerificationType::FaceRecognition.includes_qr());
    }
}
