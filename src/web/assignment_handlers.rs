// src/web/assignment_handlers.rs
use crate::{
    error::AppResult,
    models::assignment::{AssignmentPayload, AssignmentQuery, AssistantAssignment, InstructorAssignment},
    services::assignment_service,
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

// --- Docentes ---

pub async fn create_instructor(
    State(state): State<AppState>,
    Json(payload): Json<AssignmentPayload>,
) -> AppResult<(StatusCode, Json<InstructorAssignment>)> {
    let assignment = assignment_service::create_instructor_assignment(&state.db_pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn list_instructors(
    State(state): State<AppState>,
    Query(query): Query<AssignmentQuery>,
) -> AppResult<Json<Vec<InstructorAssignment>>> {
    Ok(Json(
        assignment_service::list_instructor_assignments(&state.db_pool, &query).await?,
    ))
}

pub async fn delete_instructor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    assignment_service::delete_instructor_assignment(&state.db_pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Assistentes ---

pub async fn create_assistant(
    State(state): State<AppState>,
    Json(payload): Json<AssignmentPayload>,
) -> AppResult<(StatusCode, Json<AssistantAssignment>)> {
    let assignment = assignment_service::create_assistant_assignment(&state.db_pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn list_assistants(
    State(state): State<AppState>,
    Query(query): Query<AssignmentQuery>,
) -> AppResult<Json<Vec<AssistantAssignment>>> {
    Ok(Json(
        assignment_service::list_assistant_assignments(&state.db_pool, &query).await?,
    ))
}

pub async fn delete_assistant(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    assignment_service::delete_assistant_assignment(&state.db_pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
