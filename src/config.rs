// src/config.rs
use crate::error::{AppError, AppResult};
use std::{env, net::SocketAddr, str::FromStr};

pub const DEFAULT_QR_NAMESPACE: &str = "kelas";
pub const MIN_SESSION_SECRET_BYTES: usize = 64;

/// Configuração do processo, lida das variáveis de ambiente (e do `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub session_secret: String,
    pub bind_addr: SocketAddr,
    /// Prefixo do formato antigo de QR: `<namespace>:attendance:<id>`.
    pub qr_namespace: String,
    pub cookie_secure: bool,
    pub db_max_connections: u32,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok(); // Carrega .env se existir

        let database_url = env::var("DATABASE_URL")?;
        let session_secret = env::var("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(AppError::ConfigError(format!(
                "SESSION_SECRET precisa de pelo menos {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        Ok(Self {
            database_url,
            session_secret,
            bind_addr: parse_var("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            qr_namespace: env::var("QR_NAMESPACE")
                .unwrap_or_else(|_| DEFAULT_QR_NAMESPACE.to_string()),
            cookie_secure: parse_var("SESSION_COOKIE_SECURE", false)?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        })
    }

    /// Configuração usada nos testes (base em memória, segredo fixo, bcrypt barato).
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            session_secret: "k".repeat(MIN_SESSION_SECRET_BYTES),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            qr_namespace: DEFAULT_QR_NAMESPACE.to_string(),
            cookie_secure: false,
            db_max_connections: 1,
            bcrypt_cost: 4,
        }
    }
}

/// Lê uma variável opcional; ausente -> `default`, mal formada -> erro de configuração.
fn parse_var<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::ConfigError(format!("{} tem um valor inválido: {:?}", key, raw))),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(e.into()),
    }
}
