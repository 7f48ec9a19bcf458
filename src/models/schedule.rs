// src/models/schedule.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        catalog::{AcademicPeriod, Course, Lecturer, Room, StudentGroup},
        ids::{RawId, UserId},
    },
};
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;
use std::{fmt, str::FromStr};

// --- Dia da semana ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Monday => "MONDAY",
            Day::Tuesday => "TUESDAY",
            Day::Wednesday => "WEDNESDAY",
            Day::Thursday => "THURSDAY",
            Day::Friday => "FRIDAY",
            Day::Saturday => "SATURDAY",
            Day::Sunday => "SUNDAY",
        }
    }

    /// Nome local (Bahasa Indonesia) usado pelo diretório do campus.
    fn local_name(&self) -> &'static str {
        match self {
            Day::Monday => "SENIN",
            Day::Tuesday => "SELASA",
            Day::Wednesday => "RABU",
            Day::Thursday => "KAMIS",
            Day::Friday => "JUMAT",
            Day::Saturday => "SABTU",
            Day::Sunday => "MINGGU",
        }
    }

    pub fn from_weekday(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => Day::Monday,
            chrono::Weekday::Tue => Day::Tuesday,
            chrono::Weekday::Wed => Day::Wednesday,
            chrono::Weekday::Thu => Day::Thursday,
            chrono::Weekday::Fri => Day::Friday,
            chrono::Weekday::Sat => Day::Saturday,
            chrono::Weekday::Sun => Day::Sunday,
        }
    }
}

impl FromStr for Day {
    type Err = AppError;

    /// Aceita o nome inglês (ou as 3 primeiras letras) e o nome local, sem distinguir maiúsculas.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_uppercase();
        Day::ALL
            .iter()
            .copied()
            .find(|d| {
                token == d.as_str()
                    || token == &d.as_str()[..3]
                    || token == d.local_name()
            })
            .ok_or_else(|| AppError::Validation(format!("dia desconhecido: {:?}", s)))
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Hora HH:MM ---

/// Hora do dia com precisão ao minuto, guardada e serializada como `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(ClockTime)
    }
}

impl FromStr for ClockTime {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        NaiveTime::parse_from_str(t, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M:%S"))
            .ok()
            .and_then(|parsed| NaiveTime::from_hms_opt(parsed.hour(), parsed.minute(), 0))
            .map(ClockTime)
            .ok_or_else(|| AppError::Validation(format!("hora inválida (esperado HH:MM): {:?}", s)))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Intervalo semiaberto `[start, end)` dentro de um dia.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl TimeRange {
    /// Invariante: `end` estritamente depois de `start`.
    pub fn new(start: ClockTime, end: ClockTime) -> AppResult<Self> {
        if end <= start {
            return Err(AppError::Validation(format!(
                "end_time ({}) tem de ser depois de start_time ({})",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> AppResult<Self> {
        Self::new(start.parse()?, end.parse()?)
    }

    /// Conflito sse `s1 < e2 AND s2 < e1`.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

// --- Horário (entrada da grelha) ---

#[derive(Debug, Clone, Serialize)]
pub struct CourseSchedule {
    pub id: i64,
    pub course_id: i64,
    pub room_id: i64,
    pub student_group_id: i64,
    pub academic_period_id: i64,
    pub lecturer_id: UserId,
    pub day: Day,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub capacity: i64,
    pub enrolled: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl CourseSchedule {
    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

/// Linha crua de `course_schedules`; as horas vêm como texto.
#[derive(Debug, FromRow)]
pub struct ScheduleRow {
    pub id: i64,
    pub course_id: i64,
    pub room_id: i64,
    pub student_group_id: i64,
    pub academic_period_id: i64,
    pub lecturer_id: UserId,
    pub day: Day,
    pub start_time: String,
    pub end_time: String,
    pub capacity: i64,
    pub enrolled: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl TryFrom<ScheduleRow> for CourseSchedule {
    type Error = AppError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        let parse = |raw: &str| {
            raw.parse::<ClockTime>().map_err(|_| {
                tracing::error!("Horário {} tem hora corrompida na DB: {:?}", row.id, raw);
                AppError::InternalServerError
            })
        };
        Ok(CourseSchedule {
            id: row.id,
            course_id: row.course_id,
            room_id: row.room_id,
            student_group_id: row.student_group_id,
            academic_period_id: row.academic_period_id,
            lecturer_id: row.lecturer_id,
            day: row.day,
            start_time: parse(&row.start_time)?,
            end_time: parse(&row.end_time)?,
            capacity: row.capacity,
            enrolled: row.enrolled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Horário com as entidades referenciadas resolvidas por chamadas explícitas.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleDetail {
    #[serde(flatten)]
    pub schedule: CourseSchedule,
    pub course: Course,
    pub room: Room,
    pub student_group: StudentGroup,
    pub academic_period: AcademicPeriod,
    pub lecturer: Option<Lecturer>,
}

// --- Pedidos ---

/// Payload de criação/edição de um horário.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    pub course_id: RawId,
    pub room_id: RawId,
    pub student_group_id: RawId,
    pub academic_period_id: RawId,
    /// Docente escolhido explicitamente; ausente -> usa a atribuição do curso/período.
    pub lecturer_id: Option<RawId>,
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    pub capacity: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConflictCheckRequest {
    pub room_id: Option<RawId>,
    pub lecturer_id: Option<RawId>,
    pub student_group_id: Option<RawId>,
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    pub exclude_id: Option<RawId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleQuery {
    pub course_id: Option<i64>,
    pub student_group_id: Option<i64>,
    pub room_id: Option<i64>,
    pub lecturer_id: Option<i64>,
}

// --- Conflitos (apenas informativos) ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConflictFlags {
    pub room: bool,
    pub lecturer: bool,
    pub student_group: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictIds {
    pub room: Vec<i64>,
    pub lecturer: Vec<i64>,
    pub student_group: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub conflicts: ConflictFlags,
    pub conflicting_schedules: ConflictIds,
    /// Sempre `false`: conflitos de recursos são avisos, nunca bloqueiam.
    pub has_blocking_conflict: bool,
}

impl ConflictReport {
    pub fn from_ids(ids: ConflictIds) -> Self {
        Self {
            conflicts: ConflictFlags {
                room: !ids.room.is_empty(),
                lecturer: !ids.lecturer.is_empty(),
                student_group: !ids.student_group.is_empty(),
            },
            conflicting_schedules: ids,
            has_blocking_conflict: false,
        }
    }

    pub fn any(&self) -> bool {
        self.conflicts.room || self.conflicts.lecturer || self.conflicts.student_group
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleWithConflicts {
    pub schedule: CourseSchedule,
    #[serde(flatten)]
    pub report: ConflictReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    #[test]
    fn day_tokens() {
        assert_eq!("monday".parse::<Day>().unwrap(), Day::Monday);
        assert_eq!("Mon".parse::<Day>().unwrap(), Day::Monday);
        assert_eq!("SENIN".parse::<Day>().unwrap(), Day::Monday);
        assert_eq!("Jumat".parse::<Day>().unwrap(), Day::Friday);
        assert!(matches!("Funday".parse::<Day>(), Err(AppError::Validation(_))));
    }

    #[test]
    fn clock_time_parses_and_displays_hh_mm() {
        assert_eq!(t("08:00").to_string(), "08:00");
        assert_eq!(t("8:05").to_string(), "08:05");
        assert_eq!(t("09:40:00").to_string(), "09:40");
        assert!("25:00".parse::<ClockTime>().is_err());
        assert!("0800".parse::<ClockTime>().is_err());
    }

    #[test]
    fn end_must_be_after_start() {
        assert!(TimeRange::parse("08:00", "09:40").is_ok());
        assert!(matches!(
            TimeRange::parse("09:40", "09:40"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            TimeRange::parse("10:00", "08:00"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn overlap_is_half_open() {
        let a = TimeRange::parse("08:00", "09:40").unwrap();
        let b = TimeRange::parse("09:00", "10:00").unwrap();
        let c = TimeRange::parse("09:40", "11:00").unwrap();
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // encostados não conflituam
        assert!(a.overlaps(&a));
    }

    #[test]
    fn report_never_blocks() {
        let report = ConflictReport::from_ids(ConflictIds {
            room: vec![1],
            ..Default::default()
        });
        assert!(report.conflicts.room);
        assert!(!report.conflicts.lecturer);
        assert!(report.any());
        assert!(!report.has_blocking_conflict);
    }
}
