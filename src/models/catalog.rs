// src/models/catalog.rs
// Entidades de diretório consumidas pelo núcleo (cursos, salas, períodos, docentes, alunos, turmas).
use crate::models::ids::{RawId, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Course {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub credits: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Room {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub building: Option<String>,
    pub capacity: i64,
}

/// Período académico (ano + semestre, ex: "2024 Ímpar").
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AcademicPeriod {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub term: String,
    pub is_active: bool,
}

/// Entrada do diretório de docentes. `user_id` é a identidade externa.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lecturer {
    pub id: i64,
    pub user_id: UserId,
    pub employee_number: String,
    pub name: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Student {
    pub id: i64,
    pub user_id: Option<UserId>,
    pub student_number: String,
    pub name: String,
}

/// Turma (grupo de alunos que partilham um horário).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentGroup {
    pub id: i64,
    pub name: String,
    pub program: Option<String>,
    pub semester: Option<i64>,
}

// --- Payloads de criação ---

#[derive(Debug, Deserialize)]
pub struct NewCourse {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub credits: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewRoom {
    pub code: String,
    pub name: String,
    pub building: Option<String>,
    #[serde(default)]
    pub capacity: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewAcademicPeriod {
    pub name: String,
    pub year: i64,
    pub term: String,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct NewLecturer {
    pub user_id: RawId,
    pub employee_number: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewStudent {
    pub user_id: Option<RawId>,
    pub student_number: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewStudentGroup {
    pub name: String,
    pub program: Option<String>,
    pub semester: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct GroupMembersPayload {
    pub student_ids: Vec<RawId>,
}
