// src/lib.rs
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod web;

use crate::{error::AppResult, state::AppState};
use axum::Router;
use time::Duration;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::{cookie::Key, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

pub const SESSION_TABLE: &str = "http_sessions";

/// Cria o store das sessões HTTP na mesma base de dados e garante a tabela.
pub async fn create_session_store(state: &AppState) -> AppResult<SqliteStore> {
    let store = SqliteStore::new(state.db_pool.clone())
        .with_table_name(SESSION_TABLE)
        .map_err(|e| error::AppError::SessionError(format!("Falha ao criar session store: {}", e)))?;
    store.migrate().await?;
    Ok(store)
}

/// Router completo com as camadas de trace, cookies e sessão.
pub fn build_app(state: AppState, session_store: SqliteStore) -> Router {
    // O tamanho do segredo já foi validado em Config::from_env
    let key = Key::from(state.config.session_secret.as_bytes());

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(state.config.cookie_secure)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::days(1)))
        .with_signed(key);

    web::routes::create_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CookieManagerLayer::new())
            .layer(session_layer),
    )
}
