// src/services/schedule_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        ids::{self, UserId},
        schedule::{
            ConflictCheckRequest, ConflictReport, CourseSchedule, Day, ScheduleDetail,
            ScheduleQuery, ScheduleRequest, ScheduleRow, ScheduleWithConflicts, TimeRange,
        },
    },
    services::{
        assignment_service, catalog_service,
        conflict_service::{self, ResourceAxis, Resources},
        directory_service,
    },
};
use sqlx::SqlitePool;

const SCHEDULE_COLUMNS: &str = "id, course_id, room_id, student_group_id, academic_period_id, \
     lecturer_id, day, start_time, end_time, capacity, enrolled, created_at, updated_at";

const WEEK_ORDER: &str = "CASE day WHEN 'MONDAY' THEN 1 WHEN 'TUESDAY' THEN 2 \
     WHEN 'WEDNESDAY' THEN 3 WHEN 'THURSDAY' THEN 4 WHEN 'FRIDAY' THEN 5 \
     WHEN 'SATURDAY' THEN 6 ELSE 7 END, start_time, id";

fn into_schedules(rows: Vec<ScheduleRow>) -> AppResult<Vec<CourseSchedule>> {
    rows.into_iter().map(CourseSchedule::try_from).collect()
}

/// Horário já validado, pronto a gravar.
#[derive(Debug, Clone)]
struct ValidSchedule {
    course_id: i64,
    room_id: i64,
    student_group_id: i64,
    academic_period_id: i64,
    lecturer_id: UserId,
    day: Day,
    range: TimeRange,
    capacity: i64,
    enrolled: i64,
}

impl ValidSchedule {
    fn resources(&self) -> Resources {
        Resources {
            room_id: Some(self.room_id),
            lecturer_id: Some(self.lecturer_id),
            student_group_id: Some(self.student_group_id),
        }
    }
}

/// Valida o pedido: formato primeiro (dia, horas, ids), depois existência das entidades
/// e por fim resolve o docente.
async fn validate(db_pool: &SqlitePool, req: &ScheduleRequest) -> AppResult<ValidSchedule> {
    let day: Day = req.day.parse()?;
    let range = TimeRange::parse(&req.start_time, &req.end_time)?;
    let course_id = req.course_id.parse("course_id")?;
    let room_id = req.room_id.parse("room_id")?;
    let student_group_id = req.student_group_id.parse("student_group_id")?;
    let academic_period_id = req.academic_period_id.parse("academic_period_id")?;
    let requested_lecturer = ids::parse_optional(req.lecturer_id.as_ref(), "lecturer_id")?;
    if matches!(req.capacity, Some(c) if c < 0) {
        return Err(AppError::Validation("capacity não pode ser negativa".into()));
    }

    if catalog_service::find_course(db_pool, course_id).await?.is_none() {
        return Err(AppError::NotFound(format!("curso {}", course_id)));
    }
    let room = catalog_service::find_room(db_pool, room_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("sala {}", room_id)))?;
    if catalog_service::find_group(db_pool, student_group_id).await?.is_none() {
        return Err(AppError::NotFound(format!("turma {}", student_group_id)));
    }
    if catalog_service::find_period(db_pool, academic_period_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound(format!("período {}", academic_period_id)));
    }

    let lecturer_id = assignment_service::resolve_instructor(
        db_pool,
        course_id,
        academic_period_id,
        requested_lecturer,
    )
    .await?;
    let enrolled = directory_service::count_members(db_pool, student_group_id).await?;

    Ok(ValidSchedule {
        course_id,
        room_id,
        student_group_id,
        academic_period_id,
        lecturer_id,
        day,
        range,
        capacity: req.capacity.unwrap_or(room.capacity),
        enrolled,
    })
}

fn log_conflicts(action: &str, schedule: &CourseSchedule, report: &ConflictReport) {
    if report.any() {
        tracing::warn!(
            "Horário {} {} com conflitos (não bloqueantes): {:?} -> {:?}",
            schedule.id,
            action,
            report.conflicts,
            report.conflicting_schedules
        );
    }
}

/// Cria um horário. Conflitos de recursos vêm no resultado mas não impedem a criação.
pub async fn create_schedule(db_pool: &SqlitePool, req: &ScheduleRequest) -> AppResult<ScheduleWithConflicts> {
    let v = validate(db_pool, req).await?;
    let report = conflict_service::check_all(db_pool, v.resources(), v.day, &v.range, None).await?;

    let row = sqlx::query_as::<_, ScheduleRow>(&format!(
        "INSERT INTO course_schedules
            (course_id, room_id, student_group_id, academic_period_id, lecturer_id,
             day, start_time, end_time, capacity, enrolled)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         RETURNING {}",
        SCHEDULE_COLUMNS
    ))
    .bind(v.course_id)
    .bind(v.room_id)
    .bind(v.student_group_id)
    .bind(v.academic_period_id)
    .bind(v.lecturer_id)
    .bind(v.day)
    .bind(v.range.start.to_string())
    .bind(v.range.end.to_string())
    .bind(v.capacity)
    .bind(v.enrolled)
    .fetch_one(db_pool)
    .await?;
    let schedule = CourseSchedule::try_from(row)?;

    tracing::info!(
        "Horário {} criado: curso {} {} {}-{}",
        schedule.id,
        schedule.course_id,
        schedule.day,
        schedule.start_time,
        schedule.end_time
    );
    log_conflicts("criado", &schedule, &report);
    Ok(ScheduleWithConflicts { schedule, report })
}

/// Edita um horário; volta a validar tudo e exclui-se a si próprio da verificação de conflitos.
pub async fn update_schedule(
    db_pool: &SqlitePool,
    id: i64,
    req: &ScheduleRequest,
) -> AppResult<ScheduleWithConflicts> {
    get_schedule(db_pool, id).await?;
    let v = validate(db_pool, req).await?;
    let report = conflict_service::check_all(db_pool, v.resources(), v.day, &v.range, Some(id)).await?;

    let row = sqlx::query_as::<_, ScheduleRow>(&format!(
        "UPDATE course_schedules SET
            course_id = ?1, room_id = ?2, student_group_id = ?3, academic_period_id = ?4,
            lecturer_id = ?5, day = ?6, start_time = ?7, end_time = ?8, capacity = ?9,
            enrolled = ?10, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?11 AND deleted_at IS NULL
         RETURNING {}",
        SCHEDULE_COLUMNS
    ))
    .bind(v.course_id)
    .bind(v.room_id)
    .bind(v.student_group_id)
    .bind(v.academic_period_id)
    .bind(v.lecturer_id)
    .bind(v.day)
    .bind(v.range.start.to_string())
    .bind(v.range.end.to_string())
    .bind(v.capacity)
    .bind(v.enrolled)
    .bind(id)
    .fetch_optional(db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("horário {}", id)))?;
    let schedule = CourseSchedule::try_from(row)?;

    tracing::info!("Horário {} atualizado", id);
    log_conflicts("atualizado", &schedule, &report);
    Ok(ScheduleWithConflicts { schedule, report })
}

/// Soft-delete: o histórico de presenças continua a apontar para o horário.
pub async fn delete_schedule(db_pool: &SqlitePool, id: i64) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE course_schedules SET deleted_at = CURRENT_TIMESTAMP WHERE id = ?1 AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(db_pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("horário {}", id)));
    }
    tracing::info!("Horário {} removido (soft delete)", id);
    Ok(())
}

/// Verificação avulsa de conflitos (sem gravar nada).
pub async fn check_conflicts(db_pool: &SqlitePool, req: &ConflictCheckRequest) -> AppResult<ConflictReport> {
    let day: Day = req.day.parse()?;
    let range = TimeRange::parse(&req.start_time, &req.end_time)?;
    let room_id = ids::parse_optional(req.room_id.as_ref(), "room_id")?;
    let lecturer_key = ids::parse_optional(req.lecturer_id.as_ref(), "lecturer_id")?;
    let student_group_id = ids::parse_optional(req.student_group_id.as_ref(), "student_group_id")?;
    let exclude_id = ids::parse_optional(req.exclude_id.as_ref(), "exclude_id")?;

    // O docente passa pela mesma cadeia do diretório que ao gravar um horário
    let lecturer_id = match lecturer_key {
        Some(key) => Some(directory_service::resolve_lecturer_user(db_pool, key).await?),
        None => None,
    };
    let resources = Resources {
        room_id,
        lecturer_id,
        student_group_id,
    };
    conflict_service::check_all(db_pool, resources, day, &range, exclude_id).await
}

// --- Leitura ---

pub async fn find_schedule(db_pool: &SqlitePool, id: i64) -> AppResult<Option<CourseSchedule>> {
    sqlx::query_as::<_, ScheduleRow>(&format!(
        "SELECT {} FROM course_schedules WHERE id = ?1 AND deleted_at IS NULL",
        SCHEDULE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db_pool)
    .await?
    .map(CourseSchedule::try_from)
    .transpose()
}

pub async fn get_schedule(db_pool: &SqlitePool, id: i64) -> AppResult<CourseSchedule> {
    find_schedule(db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("horário {}", id)))
}

/// Horário com curso, sala, turma, período e docente resolvidos um a um.
pub async fn schedule_detail(db_pool: &SqlitePool, id: i64) -> AppResult<ScheduleDetail> {
    let schedule = get_schedule(db_pool, id).await?;
    let missing = |what: &str| {
        tracing::error!("Horário {} aponta para {} inexistente", id, what);
        AppError::InternalServerError
    };

    let course = catalog_service::find_course(db_pool, schedule.course_id)
        .await?
        .ok_or_else(|| missing("curso"))?;
    let room = catalog_service::find_room(db_pool, schedule.room_id)
        .await?
        .ok_or_else(|| missing("sala"))?;
    let student_group = catalog_service::find_group(db_pool, schedule.student_group_id)
        .await?
        .ok_or_else(|| missing("turma"))?;
    let academic_period = catalog_service::find_period(db_pool, schedule.academic_period_id)
        .await?
        .ok_or_else(|| missing("período"))?;
    let lecturer = directory_service::find_lecturer_by_user_id(db_pool, schedule.lecturer_id).await?;

    Ok(ScheduleDetail {
        schedule,
        course,
        room,
        student_group,
        academic_period,
        lecturer,
    })
}

async fn list_by_column(db_pool: &SqlitePool, column: &str, value: i64) -> AppResult<Vec<CourseSchedule>> {
    let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
        "SELECT {} FROM course_schedules WHERE {} = ?1 AND deleted_at IS NULL ORDER BY {}",
        SCHEDULE_COLUMNS, column, WEEK_ORDER
    ))
    .bind(value)
    .fetch_all(db_pool)
    .await?;
    into_schedules(rows)
}

pub async fn list_by_course(db_pool: &SqlitePool, course_id: i64) -> AppResult<Vec<CourseSchedule>> {
    list_by_column(db_pool, "course_id", course_id).await
}

pub async fn list_by_cohort(db_pool: &SqlitePool, student_group_id: i64) -> AppResult<Vec<CourseSchedule>> {
    list_by_column(db_pool, ResourceAxis::StudentGroup.column(), student_group_id).await
}

pub async fn list_by_room(db_pool: &SqlitePool, room_id: i64) -> AppResult<Vec<CourseSchedule>> {
    list_by_column(db_pool, ResourceAxis::Room.column(), room_id).await
}

pub async fn list_by_instructor(db_pool: &SqlitePool, lecturer_id: UserId) -> AppResult<Vec<CourseSchedule>> {
    list_by_column(db_pool, ResourceAxis::Lecturer.column(), lecturer_id.0).await
}

pub async fn list_all(db_pool: &SqlitePool) -> AppResult<Vec<CourseSchedule>> {
    let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
        "SELECT {} FROM course_schedules WHERE deleted_at IS NULL ORDER BY {}",
        SCHEDULE_COLUMNS, WEEK_ORDER
    ))
    .fetch_all(db_pool)
    .await?;
    into_schedules(rows)
}

/// Candidatos à verificação de conflitos: horários ativos de um recurso num dia.
pub async fn list_by_resource_on_day(
    db_pool: &SqlitePool,
    axis: ResourceAxis,
    resource_id: i64,
    day: Day,
) -> AppResult<Vec<CourseSchedule>> {
    let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
        "SELECT {} FROM course_schedules
         WHERE {} = ?1 AND day = ?2 AND deleted_at IS NULL
         ORDER BY start_time, id",
        SCHEDULE_COLUMNS,
        axis.column()
    ))
    .bind(resource_id)
    .bind(day)
    .fetch_all(db_pool)
    .await?;
    into_schedules(rows)
}

/// Aceita no máximo um filtro; sem filtros devolve tudo.
pub async fn list_filtered(db_pool: &SqlitePool, query: &ScheduleQuery) -> AppResult<Vec<CourseSchedule>> {
    match (
        query.course_id,
        query.student_group_id,
        query.room_id,
        query.lecturer_id,
    ) {
        (None, None, None, None) => list_all(db_pool).await,
        (Some(id), None, None, None) => list_by_course(db_pool, id).await,
        (None, Some(id), None, None) => list_by_cohort(db_pool, id).await,
        (None, None, Some(id), None) => list_by_room(db_pool, id).await,
        (None, None, None, Some(key)) => {
            let lecturer = directory_service::resolve_lecturer_user(db_pool, key).await?;
            list_by_instructor(db_pool, lecturer).await
        }
        _ => Err(AppError::Validation(
            "use apenas um filtro: course_id, student_group_id, room_id ou lecturer_id".into(),
        )),
    }
}

/// Horários em que o utilizador é docente ou assistente atribuído.
pub async fn list_for_staff(db_pool: &SqlitePool, user_id: UserId) -> AppResult<Vec<CourseSchedule>> {
    let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
        "SELECT {} FROM course_schedules cs
         WHERE cs.deleted_at IS NULL
           AND (cs.lecturer_id = ?1 OR EXISTS (
                SELECT 1 FROM assistant_assignments aa
                WHERE aa.user_id = ?1
                  AND aa.course_id = cs.course_id
                  AND aa.academic_period_id = cs.academic_period_id))
         ORDER BY {}",
        SCHEDULE_COLUMNS, WEEK_ORDER
    ))
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;
    into_schedules(rows)
}

/// Horários das turmas a que o aluno pertence.
pub async fn list_for_student(db_pool: &SqlitePool, student_id: i64) -> AppResult<Vec<CourseSchedule>> {
    let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
        "SELECT {} FROM course_schedules
         WHERE deleted_at IS NULL
           AND student_group_id IN
               (SELECT student_group_id FROM student_group_members WHERE student_id = ?1)
         ORDER BY {}",
        SCHEDULE_COLUMNS, WEEK_ORDER
    ))
    .bind(student_id)
    .fetch_all(db_pool)
    .await?;
    into_schedules(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{catalog::NewRoom, ids::RawId, schedule::ClockTime},
        services::test_fixtures::{self, Campus},
    };

    fn request(campus: &Campus, day: &str, start: &str, end: &str) -> ScheduleRequest {
        ScheduleRequest {
            course_id: RawId::from(campus.course_id),
            room_id: RawId::from(campus.room_id),
            student_group_id: RawId::from(campus.group_id),
            academic_period_id: RawId::from(campus.period_id),
            lecturer_id: None,
            day: day.into(),
            start_time: start.into(),
            end_time: end.into(),
            capacity: None,
        }
    }

    #[tokio::test]
    async fn room_conflict_is_reported_but_not_blocking() {
        // Já existe: segunda 08:00-09:40 na sala R1
        let (pool, campus) = test_fixtures::campus().await;

        let created = create_schedule(&pool, &request(&campus, "MONDAY", "09:00", "10:00"))
            .await
            .unwrap();
        assert!(created.report.conflicts.room);
        assert!(created.report.conflicts.lecturer);
        assert!(created.report.conflicts.student_group);
        assert_eq!(created.report.conflicting_schedules.room, vec![campus.schedule_id]);
        assert!(!created.report.has_blocking_conflict);
        assert!(find_schedule(&pool, created.schedule.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn back_to_back_and_other_days_do_not_conflict() {
        let (pool, campus) = test_fixtures::campus().await;
        let adjacent = create_schedule(&pool, &request(&campus, "Senin", "09:40", "11:20"))
            .await
            .unwrap();
        assert!(!adjacent.report.any());

        let tuesday = create_schedule(&pool, &request(&campus, "tue", "08:00", "09:40"))
            .await
            .unwrap();
        assert!(!tuesday.report.any());
        assert_eq!(tuesday.schedule.day, Day::Tuesday);
    }

    #[tokio::test]
    async fn end_before_start_always_fails() {
        let (pool, campus) = test_fixtures::campus().await;
        for (start, end) in [("10:00", "10:00"), ("10:00", "09:00")] {
            assert!(matches!(
                create_schedule(&pool, &request(&campus, "MONDAY", start, end)).await,
                Err(AppError::Validation(_))
            ));
        }
        let mut bad_id = request(&campus, "MONDAY", "13:00", "14:00");
        bad_id.room_id = RawId::Text("R1".into());
        assert!(matches!(create_schedule(&pool, &bad_id).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn update_excludes_itself_and_delete_is_soft() {
        let (pool, campus) = test_fixtures::campus().await;
        let updated = update_schedule(
            &pool,
            campus.schedule_id,
            &request(&campus, "MONDAY", "08:30", "10:10"),
        )
        .await
        .unwrap();
        assert!(!updated.report.any());
        assert_eq!(updated.schedule.start_time, ClockTime::new(8, 30).unwrap());
        assert!(updated.schedule.updated_at.is_some());

        delete_schedule(&pool, campus.schedule_id).await.unwrap();
        assert!(find_schedule(&pool, campus.schedule_id).await.unwrap().is_none());
        assert!(matches!(
            delete_schedule(&pool, campus.schedule_id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(list_all(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn defaults_capacity_and_enrolled() {
        let (pool, campus) = test_fixtures::campus().await;
        let schedule = get_schedule(&pool, campus.schedule_id).await.unwrap();
        assert_eq!(schedule.capacity, 40);
        assert_eq!(schedule.enrolled, campus.student_ids.len() as i64);
        assert_eq!(schedule.lecturer_id, test_fixtures::INSTRUCTOR);
    }

    #[tokio::test]
    async fn listings() {
        let (pool, campus) = test_fixtures::campus().await;
        let lab = catalog_service::create_room(
            &pool,
            &NewRoom { code: "LAB".into(), name: "Lab".into(), building: None, capacity: 20 },
        )
        .await
        .unwrap();
        let mut req = request(&campus, "FRIDAY", "13:00", "14:40");
        req.room_id = RawId::from(lab.id);
        req.lecturer_id = Some(RawId::from(test_fixtures::OTHER_LECTURER.0));
        create_schedule(&pool, &req).await.unwrap();

        assert_eq!(list_by_course(&pool, campus.course_id).await.unwrap().len(), 2);
        assert_eq!(list_by_room(&pool, lab.id).await.unwrap().len(), 1);
        assert_eq!(
            list_by_instructor(&pool, test_fixtures::OTHER_LECTURER).await.unwrap().len(),
            1
        );
        let all = list_filtered(&pool, &ScheduleQuery::default()).await.unwrap();
        assert_eq!(all[0].day, Day::Monday);

        // O assistente vê todos os horários do curso; o docente só os seus
        assert_eq!(list_for_staff(&pool, test_fixtures::ASSISTANT).await.unwrap().len(), 2);
        assert_eq!(list_for_staff(&pool, test_fixtures::INSTRUCTOR).await.unwrap().len(), 1);
        assert_eq!(list_for_student(&pool, campus.student_ids[0]).await.unwrap().len(), 2);

        let two_filters = ScheduleQuery { course_id: Some(1), room_id: Some(1), ..Default::default() };
        assert!(matches!(
            list_filtered(&pool, &two_filters).await,
            Err(AppError::Validation(_))
        ));

        let detail = schedule_detail(&pool, campus.schedule_id).await.unwrap();
        assert_eq!(detail.room.code, "R1");
        assert_eq!(detail.lecturer.unwrap().user_id, test_fixtures::INSTRUCTOR);
    }

    #[tokio::test]
    async fn lecturer_keys_resolve_the_same_everywhere() {
        let (pool, campus) = test_fixtures::campus().await;
        let lecturer = directory_service::find_lecturer_by_user_id(&pool, test_fixtures::INSTRUCTOR)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(lecturer.id, test_fixtures::INSTRUCTOR.0);

        // Id interno e número de funcionário apontam para o docente 5106
        for key in [RawId::from(lecturer.id), RawId::Text(lecturer.employee_number.clone())] {
            let check = ConflictCheckRequest {
                room_id: None,
                lecturer_id: Some(key.clone()),
                student_group_id: None,
                day: "MONDAY".into(),
                start_time: "09:00".into(),
                end_time: "10:00".into(),
                exclude_id: None,
            };
            let report = check_conflicts(&pool, &check).await.unwrap();
            assert!(report.conflicts.lecturer);
            assert_eq!(report.conflicting_schedules.lecturer, vec![campus.schedule_id]);
        }

        let mut req = request(&campus, "MONDAY", "09:00", "10:00");
        req.lecturer_id = Some(RawId::from(lecturer.id));
        let created = create_schedule(&pool, &req).await.unwrap();
        assert_eq!(created.schedule.lecturer_id, test_fixtures::INSTRUCTOR);
        assert!(created.report.conflicts.lecturer);

        let by_internal_id = ScheduleQuery { lecturer_id: Some(lecturer.id), ..Default::default() };
        assert_eq!(list_filtered(&pool, &by_internal_id).await.unwrap().len(), 2);

        let unknown = ConflictCheckRequest {
            room_id: None,
            lecturer_id: Some(RawId::from(424242)),
            student_group_id: None,
            day: "MONDAY".into(),
            start_time: "09:00".into(),
            end_time: "10:00".into(),
            exclude_id: None,
        };
        assert!(matches!(
            check_conflicts(&pool, &unknown).await,
            Err(AppError::NotFound(_))
        ));
        let unknown_filter = ScheduleQuery { lecturer_id: Some(424242), ..Default::default() };
        assert!(matches!(
            list_filtered(&pool, &unknown_filter).await,
            Err(AppError::NotFound(_))
        ));
    }
}
