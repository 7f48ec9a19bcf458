// src/models/assignment.rs
use crate::models::ids::{RawId, UserId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Docente responsável por um curso num período (no máximo um por curso/período).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InstructorAssignment {
    pub id: i64,
    pub course_id: i64,
    pub academic_period_id: i64,
    pub user_id: UserId,
    pub created_at: NaiveDateTime,
}

/// Assistente autorizado a fazer a chamada de um curso (vários por curso).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AssistantAssignment {
    pub id: i64,
    pub course_id: i64,
    pub academic_period_id: i64,
    pub user_id: UserId,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentPayload {
    pub course_id: RawId,
    pub academic_period_id: RawId,
    pub user_id: RawId,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignmentQuery {
    pub course_id: Option<i64>,
    pub academic_period_id: Option<i64>,
}
