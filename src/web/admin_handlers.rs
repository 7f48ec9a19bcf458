// src/web/admin_handlers.rs
// Gestão de utilizadores e do diretório académico (só admin).
use crate::{
    error::AppResult,
    models::{
        catalog::{
            AcademicPeriod, Course, GroupMembersPayload, Lecturer, NewAcademicPeriod, NewCourse,
            NewLecturer, NewRoom, NewStudent, NewStudentGroup, Room, Student, StudentGroup,
        },
        user::{CreateUserForm, UserWithRoles},
    },
    services::{self, attendance_service, catalog_service, directory_service, user_service},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

// --- Utilizadores ---

/// POST /admin/users
pub async fn handle_create_user(
    State(state): State<AppState>,
    Json(form): Json<CreateUserForm>,
) -> AppResult<(StatusCode, Json<UserWithRoles>)> {
    let id = form.id.user_id("id")?;
    let user = user_service::create_user(
        &state.db_pool,
        id,
        &form.username,
        &form.name,
        &form.password,
        &form.roles,
        state.config.bcrypt_cost,
    )
    .await?;
    let roles = user_service::get_user_roles(&state.db_pool, id).await?;
    Ok((StatusCode::CREATED, Json(UserWithRoles { user, roles })))
}

/// GET /admin/users
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserWithRoles>>> {
    let users = user_service::find_all_users(&state.db_pool).await?;
    let mut users_with_roles = Vec::with_capacity(users.len());
    for user in users {
        let roles = user_service::get_user_roles(&state.db_pool, user.id).await?;
        users_with_roles.push(UserWithRoles { user, roles });
    }
    Ok(Json(users_with_roles))
}

// --- Catálogo ---

pub async fn create_course(
    State(state): State<AppState>,
    Json(new): Json<NewCourse>,
) -> AppResult<(StatusCode, Json<Course>)> {
    let course = catalog_service::create_course(&state.db_pool, &new).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn list_courses(State(state): State<AppState>) -> AppResult<Json<Vec<Course>>> {
    Ok(Json(catalog_service::list_courses(&state.db_pool).await?))
}

pub async fn create_room(
    State(state): State<AppState>,
    Json(new): Json<NewRoom>,
) -> AppResult<(StatusCode, Json<Room>)> {
    let room = catalog_service::create_room(&state.db_pool, &new).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

pub async fn list_rooms(State(state): State<AppState>) -> AppResult<Json<Vec<Room>>> {
    Ok(Json(catalog_service::list_rooms(&state.db_pool).await?))
}

pub async fn create_period(
    State(state): State<AppState>,
    Json(new): Json<NewAcademicPeriod>,
) -> AppResult<(StatusCode, Json<AcademicPeriod>)> {
    let period = catalog_service::create_period(&state.db_pool, &new).await?;
    Ok((StatusCode::CREATED, Json(period)))
}

pub async fn list_periods(State(state): State<AppState>) -> AppResult<Json<Vec<AcademicPeriod>>> {
    Ok(Json(catalog_service::list_periods(&state.db_pool).await?))
}

pub async fn create_group(
    State(state): State<AppState>,
    Json(new): Json<NewStudentGroup>,
) -> AppResult<(StatusCode, Json<StudentGroup>)> {
    let group = catalog_service::create_group(&state.db_pool, &new).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn list_groups(State(state): State<AppState>) -> AppResult<Json<Vec<StudentGroup>>> {
    Ok(Json(catalog_service::list_groups(&state.db_pool).await?))
}

/// POST /admin/student-groups/{id}/members
pub async fn add_group_members(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
    Json(payload): Json<GroupMembersPayload>,
) -> AppResult<Json<Value>> {
    let student_ids = payload
        .student_ids
        .iter()
        .map(|raw| raw.parse("student_ids"))
        .collect::<AppResult<Vec<i64>>>()?;
    let added = directory_service::add_members(&state.db_pool, group_id, &student_ids).await?;
    let members = directory_service::count_members(&state.db_pool, group_id).await?;
    Ok(Json(json!({ "added": added, "members": members })))
}

// --- Diretório ---

pub async fn create_lecturer(
    State(state): State<AppState>,
    Json(new): Json<NewLecturer>,
) -> AppResult<(StatusCode, Json<Lecturer>)> {
    let lecturer = directory_service::create_lecturer(&state.db_pool, &new).await?;
    Ok((StatusCode::CREATED, Json(lecturer)))
}

pub async fn list_lecturers(State(state): State<AppState>) -> AppResult<Json<Vec<Lecturer>>> {
    Ok(Json(directory_service::list_lecturers(&state.db_pool).await?))
}

pub async fn create_student(
    State(state): State<AppState>,
    Json(new): Json<NewStudent>,
) -> AppResult<(StatusCode, Json<Student>)> {
    let student = directory_service::create_student(&state.db_pool, &new).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

pub async fn list_students(State(state): State<AppState>) -> AppResult<Json<Vec<Student>>> {
    Ok(Json(directory_service::list_students(&state.db_pool).await?))
}

// --- Presenças ---

/// POST /admin/attendance/close-expired
/// Chamado por um agendador externo para aplicar `autoClose` + `duration`.
pub async fn close_expired_sessions(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let closed = attendance_service::close_expired_sessions(&state.db_pool, services::now()).await?;
    Ok(Json(json!({ "closed": closed })))
}
