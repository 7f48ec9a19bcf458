// src/web/auth_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::user::{LoginForm, UserWithRoles},
    services::{auth_service, user_service},
    state::AppState,
    web::mw_auth::{CurrentUser, SESSION_USER_KEY},
};
use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};
use tower_sessions::Session;

// GET /health
pub async fn health(State(state): State<AppState>) -> AppResult<Json<Value>> {
    sqlx::query("SELECT 1").execute(&state.db_pool).await?;
    Ok(Json(json!({ "status": "ok" })))
}

// POST /login
pub async fn handle_login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> AppResult<Json<UserWithRoles>> {
    tracing::info!("Tentativa de login para: {}", form.username);

    let user = auth_service::authenticate(&state.db_pool, &form.username, &form.password).await?;

    // Novo ID de sessão depois do login
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao rodar ID: {}", e)))?;
    session
        .insert(SESSION_USER_KEY, user.id.0)
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao inserir na sessão: {}", e)))?;

    let roles = user_service::get_user_roles(&state.db_pool, user.id).await?;
    tracing::info!("✅ Login bem-sucedido para: {}", user.id);
    Ok(Json(UserWithRoles { user, roles }))
}

// POST /logout
pub async fn handle_logout(session: Session) -> AppResult<Json<Value>> {
    let user_id: Option<i64> = session.get(SESSION_USER_KEY).await.ok().flatten();

    session
        .delete()
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao apagar sessão: {}", e)))?;

    match user_id {
        Some(id) => tracing::info!("🚪 Utilizador '{}' desligado.", id),
        None => tracing::info!("🚪 Sessão anónima desligada."),
    }
    Ok(Json(json!({ "logged_out": true })))
}

// GET /me
pub async fn me(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> AppResult<Json<UserWithRoles>> {
    let user = user_service::find_user_by_id(&state.db_pool, user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    let roles = user_service::get_user_roles(&state.db_pool, user_id).await?;
    Ok(Json(UserWithRoles { user, roles }))
}
