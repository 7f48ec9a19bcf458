// src/error.rs
use crate::models::attendance::OpenerRole;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Erro na base de dados: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Erro de migração da base de dados: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Erro de variável de ambiente: {0}")]
    EnvVarError(#[from] std::env::VarError),

    #[error("Configuração inválida: {0}")]
    ConfigError(String),

    #[error("Erro ao processar password")]
    PasswordHashingError,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Erro na sessão: {0}")]
    SessionError(String),

    #[error("Erro interno inesperado")]
    InternalServerError,

    /// Pedido sem sessão autenticada.
    #[error("Não autenticado")]
    Unauthenticated,

    // --- Erros de domínio ---
    #[error("Dados inválidos: {0}")]
    Validation(String),

    #[error("Sem permissão: {0}")]
    NotAuthorized(String),

    #[error("Não encontrado: {0}")]
    NotFound(String),

    #[error("Já existe: {0}")]
    AlreadyExists(String),

    /// Já existe uma sessão ACTIVE do mesmo abridor ou do mesmo papel.
    #[error("Já existe uma sessão ativa aberta por {role}")]
    DuplicateActiveSession { role: OpenerRole },

    #[error("O docente já abriu uma sessão ativa para este horário")]
    InstructorSessionExists,

    #[error("Sessão de presença não está ativa")]
    SessionNotActive,

    #[error("QR code inválido para esta sessão")]
    InvalidQrPayload,

    #[error("Aluno não pertence à turma deste horário")]
    NotEnrolled,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::SqlxError(_)
            | AppError::SqlxMigrateError(_)
            | AppError::EnvVarError(_)
            | AppError::ConfigError(_)
            | AppError::PasswordHashingError
            | AppError::SessionError(_)
            | AppError::InternalServerError => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::NotAuthorized(_) => (StatusCode::FORBIDDEN, "not_authorized"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::AlreadyExists(_) => (StatusCode::CONFLICT, "already_exists"),
            AppError::DuplicateActiveSession { .. } => {
                (StatusCode::CONFLICT, "duplicate_active_session")
            }
            AppError::InstructorSessionExists => {
                (StatusCode::CONFLICT, "instructor_session_exists")
            }
            AppError::SessionNotActive => (StatusCode::CONFLICT, "session_not_active"),
            AppError::InvalidQrPayload => (StatusCode::BAD_REQUEST, "invalid_qr_payload"),
            AppError::NotEnrolled => (StatusCode::FORBIDDEN, "not_enrolled"),
        }
    }

    /// Indica se o erro veio de uma violação de índice UNIQUE no SQLite.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::SqlxError(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

// Como converter AppError numa resposta HTTP (JSON)
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = self.status_and_code();

        // Erros internos: detalhe só no log, mensagem genérica para o cliente
        let message = if status.is_server_error() {
            tracing::error!("Erro processado: {:?}", self);
            "Ocorreu um erro inesperado.".to_string()
        } else {
            tracing::warn!("Pedido rejeitado ({}): {}", code, self);
            self.to_string()
        };

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

// Tipo Result padrão para a aplicação
pub type AppResult<T = ()> = Result<T, AppError>;
