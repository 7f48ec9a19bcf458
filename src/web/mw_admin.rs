// src/web/mw_admin.rs
use crate::{
    error::AppError,
    services::user_service,
    state::AppState,
    web::mw_auth::CurrentUser,
};
use axum::{
    extract::{Extension, Request, State},
    middleware::Next,
    response::Response,
};

/// Middleware que verifica se o utilizador logado tem a role "admin".
/// Corre *depois* de `require_auth`.
pub async fn require_admin(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    tracing::debug!("Admin MW: verificando role 'admin' para {}", user_id);

    if user_service::is_admin(&state.db_pool, user_id).await? {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("Admin MW: acesso negado para {} (sem role admin)", user_id);
        Err(AppError::NotAuthorized("requer role admin".into()))
    }
}
