// src/services/test_fixtures.rs
// Campus mínimo para os testes: um curso com docente e dois assistentes,
// uma turma de dez alunos e um horário à segunda 08:00-09:40 na sala R1.
use crate::{
    db::create_memory_pool,
    models::{
        assignment::AssignmentPayload,
        catalog::{NewAcademicPeriod, NewCourse, NewLecturer, NewRoom, NewStudent, NewStudentGroup},
        ids::{RawId, UserId},
        schedule::ScheduleRequest,
    },
    services::{assignment_service, catalog_service, directory_service, schedule_service},
};
use sqlx::SqlitePool;

pub const INSTRUCTOR: UserId = UserId(5106);
pub const OTHER_LECTURER: UserId = UserId(5200);
pub const ASSISTANT: UserId = UserId(7001);
pub const ASSISTANT_2: UserId = UserId(7002);
pub const OUTSIDER: UserId = UserId(8000);
/// user_id do primeiro aluno; os seguintes são consecutivos.
pub const FIRST_STUDENT_USER: i64 = 9001;
pub const STUDENTS: usize = 10;

pub struct Campus {
    pub course_id: i64,
    pub room_id: i64,
    pub period_id: i64,
    pub group_id: i64,
    pub schedule_id: i64,
    pub instructor_assignment_id: i64,
    /// Ids internos, pela ordem dos user_id.
    pub student_ids: Vec<i64>,
}

impl Campus {
    pub fn student_user(&self, index: usize) -> UserId {
        UserId(FIRST_STUDENT_USER + index as i64)
    }
}

pub async fn campus() -> (SqlitePool, Campus) {
    let pool = create_memory_pool().await.unwrap();
    let campus = seed(&pool).await;
    (pool, campus)
}

/// Semeia o campus num pool já migrado.
pub async fn seed(pool: &SqlitePool) -> Campus {
    let course = catalog_service::create_course(
        pool,
        &NewCourse { code: "IF201".into(), name: "Basis Data".into(), credits: 3 },
    )
    .await
    .unwrap();
    let room = catalog_service::create_room(
        pool,
        &NewRoom { code: "R1".into(), name: "Ruang 1".into(), building: Some("Gedung A".into()), capacity: 40 },
    )
    .await
    .unwrap();
    let period = catalog_service::create_period(
        pool,
        &NewAcademicPeriod { name: "2024 Ganjil".into(), year: 2024, term: "ODD".into(), is_active: true },
    )
    .await
    .unwrap();
    let group = catalog_service::create_group(
        pool,
        &NewStudentGroup { name: "TI-3A".into(), program: Some("Informatika".into()), semester: Some(3) },
    )
    .await
    .unwrap();

    for (user_id, number) in [(INSTRUCTOR, "198001"), (OTHER_LECTURER, "198002")] {
        directory_service::create_lecturer(
            pool,
            &NewLecturer { user_id: RawId::from(user_id.0), employee_number: number.into(), name: format!("Dosen {}", user_id) },
        )
        .await
        .unwrap();
    }

    let mut student_ids = Vec::with_capacity(STUDENTS);
    for i in 0..STUDENTS as i64 {
        let student = directory_service::create_student(
            pool,
            &NewStudent {
                user_id: Some(RawId::from(FIRST_STUDENT_USER + i)),
                student_number: format!("24{:03}", i + 1),
                name: format!("Mahasiswa {}", i + 1),
            },
        )
        .await
        .unwrap();
        student_ids.push(student.id);
    }
    directory_service::add_members(pool, group.id, &student_ids)
        .await
        .unwrap();

    let assignment = |user: UserId| AssignmentPayload {
        course_id: RawId::from(course.id),
        academic_period_id: RawId::from(period.id),
        user_id: RawId::from(user.0),
    };
    let instructor_assignment =
        assignment_service::create_instructor_assignment(pool, &assignment(INSTRUCTOR))
            .await
            .unwrap();
    for assistant in [ASSISTANT, ASSISTANT_2] {
        assignment_service::create_assistant_assignment(pool, &assignment(assistant))
            .await
            .unwrap();
    }

    let created = schedule_service::create_schedule(
        pool,
        &ScheduleRequest {
            course_id: RawId::from(course.id),
            room_id: RawId::from(room.id),
            student_group_id: RawId::from(group.id),
            academic_period_id: RawId::from(period.id),
            lecturer_id: None,
            day: "MONDAY".into(),
            start_time: "08:00".into(),
            end_time: "09:40".into(),
            capacity: None,
        },
    )
    .await
    .unwrap();

    Campus {
        course_id: course.id,
        room_id: room.id,
        period_id: period.id,
        group_id: group.id,
        schedule_id: created.schedule.id,
        instructor_assignment_id: instructor_assignment.id,
        student_ids,
    }
}
