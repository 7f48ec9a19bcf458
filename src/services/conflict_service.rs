// src/services/conflict_service.rs
// Deteção de sobreposições de horário por sala, docente e turma.
// Os conflitos são só informativos: nunca impedem criar ou editar um horário.
use crate::{
    error::AppResult,
    models::{
        ids::UserId,
        schedule::{ConflictIds, ConflictReport, CourseSchedule, Day, TimeRange},
    },
    services::schedule_service,
};
use sqlx::SqlitePool;

/// Eixo de recurso verificado de forma independente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceAxis {
    Room,
    Lecturer,
    StudentGroup,
}

impl ResourceAxis {
    pub fn column(&self) -> &'static str {
        match self {
            ResourceAxis::Room => "room_id",
            ResourceAxis::Lecturer => "lecturer_id",
            ResourceAxis::StudentGroup => "student_group_id",
        }
    }
}

/// Recursos de um horário candidato; `None` salta esse eixo.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resources {
    pub room_id: Option<i64>,
    pub lecturer_id: Option<UserId>,
    pub student_group_id: Option<i64>,
}

/// Ids dos candidatos (já filtrados por recurso e dia) que se sobrepõem a `range`.
pub fn conflicting_ids(
    candidates: &[CourseSchedule],
    range: &TimeRange,
    exclude_id: Option<i64>,
) -> Vec<i64> {
    candidates
        .iter()
        .filter(|s| Some(s.id) != exclude_id)
        .filter(|s| s.time_range().overlaps(range))
        .map(|s| s.id)
        .collect()
}

async fn conflicts_on_axis(
    db_pool: &SqlitePool,
    axis: ResourceAxis,
    resource_id: i64,
    day: Day,
    range: &TimeRange,
    exclude_id: Option<i64>,
) -> AppResult<Vec<i64>> {
    let candidates = schedule_service::list_by_resource_on_day(db_pool, axis, resource_id, day).await?;
    Ok(conflicting_ids(&candidates, range, exclude_id))
}

/// `hasConflict` para um único eixo.
pub async fn has_conflict(
    db_pool: &SqlitePool,
    axis: ResourceAxis,
    resource_id: i64,
    day: Day,
    range: &TimeRange,
    exclude_id: Option<i64>,
) -> AppResult<bool> {
    Ok(!conflicts_on_axis(db_pool, axis, resource_id, day, range, exclude_id)
        .await?
        .is_empty())
}

/// Verifica os três eixos e junta o resultado num relatório não bloqueante.
pub async fn check_all(
    db_pool: &SqlitePool,
    resources: Resources,
    day: Day,
    range: &TimeRange,
    exclude_id: Option<i64>,
) -> AppResult<ConflictReport> {
    let mut ids = ConflictIds::default();
    if let Some(room_id) = resources.room_id {
        ids.room = conflicts_on_axis(db_pool, ResourceAxis::Room, room_id, day, range, exclude_id).await?;
    }
    if let Some(lecturer_id) = resources.lecturer_id {
        ids.lecturer =
            conflicts_on_axis(db_pool, ResourceAxis::Lecturer, lecturer_id.0, day, range, exclude_id).await?;
    }
    if let Some(group_id) = resources.student_group_id {
        ids.student_group =
            conflicts_on_axis(db_pool, ResourceAxis::StudentGroup, group_id, day, range, exclude_id).await?;
    }

    let report = ConflictReport::from_ids(ids);
    if report.any() {
        tracing::debug!(
            "Conflitos em {} {}-{}: {:?}",
            day,
            range.start,
            range.end,
            report.conflicts
        );
    }
    Ok(report)
}
