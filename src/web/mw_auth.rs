// src/web/mw_auth.rs
use crate::{error::AppError, models::ids::UserId};
use axum::{extract::Request, middleware::Next, response::Response};
use tower_sessions::Session;

/// Chave da sessão HTTP onde fica o id do utilizador autenticado.
pub const SESSION_USER_KEY: &str = "user_id";

// Utilizador autenticado, posto nas extensões do pedido por `require_auth`
#[derive(Clone, Copy, Debug)]
pub struct CurrentUser(pub UserId);

// Middleware que verifica se o utilizador está logado
pub async fn require_auth(
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match session.get::<i64>(SESSION_USER_KEY).await {
        Ok(Some(user_id)) => {
            tracing::debug!("Autenticação MW: utilizador {} autenticado", user_id);
            request
                .extensions_mut()
                .insert(CurrentUser(UserId(user_id)));
            Ok(next.run(request).await)
        }
        Ok(None) => {
            tracing::debug!("Autenticação MW: pedido sem sessão para {}", request.uri());
            Err(AppError::Unauthenticated)
        }
        Err(e) => {
            tracing::error!("Autenticação MW: erro ao ler sessão: {:?}", e);
            Err(AppError::SessionError(format!("Erro ao verificar sessão: {}", e)))
        }
    }
}
