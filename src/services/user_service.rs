// src/services/user_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{ids::UserId, user::User},
};
use sqlx::SqlitePool;

pub const ROLE_ADMIN: &str = "admin";

pub const DEFINED_ROLES: &[&str] = &[ROLE_ADMIN, "lecturer", "assistant", "student"];

const USER_COLUMNS: &str = "id, username, password_hash, name, created_at, updated_at";

/// Busca um utilizador pelo seu id (identidade externa).
pub async fn find_user_by_id(db_pool: &SqlitePool, user_id: UserId) -> AppResult<Option<User>> {
    tracing::debug!("Buscando utilizador por ID: {}", user_id);
    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?;
    Ok(user)
}

pub async fn find_user_by_username(db_pool: &SqlitePool, username: &str) -> AppResult<Option<User>> {
    tracing::debug!("Buscando utilizador por username: {}", username);
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE username = ?1",
        USER_COLUMNS
    ))
    .bind(username.trim())
    .fetch_optional(db_pool)
    .await?;
    Ok(user)
}

pub async fn find_all_users(db_pool: &SqlitePool) -> AppResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))
        .fetch_all(db_pool)
        .await?;
    Ok(users)
}

/// Busca as roles de um utilizador.
pub async fn get_user_roles(db_pool: &SqlitePool, user_id: UserId) -> AppResult<Vec<String>> {
    let roles: Vec<String> =
        sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = ?1 ORDER BY role ASC")
            .bind(user_id)
            .fetch_all(db_pool)
            .await?;
    tracing::debug!("Roles encontradas para {}: {:?}", user_id, roles);
    Ok(roles)
}

/// Verifica se o utilizador tem pelo menos uma das roles indicadas.
pub async fn check_user_role_any(
    db_pool: &SqlitePool,
    user_id: UserId,
    required: &[&str],
) -> AppResult<bool> {
    let roles = get_user_roles(db_pool, user_id).await?;
    Ok(roles
        .iter()
        .any(|r| required.iter().any(|req| r.eq_ignore_ascii_case(req))))
}

pub async fn is_admin(db_pool: &SqlitePool, user_id: UserId) -> AppResult<bool> {
    check_user_role_any(db_pool, user_id, &[ROLE_ADMIN]).await
}

/// Cria um utilizador e as suas roles numa única transação.
pub async fn create_user(
    db_pool: &SqlitePool,
    id: UserId,
    username: &str,
    name: &str,
    raw_password: &str,
    roles: &[String],
    bcrypt_cost: u32,
) -> AppResult<User> {
    tracing::info!("Tentando criar utilizador: {} ({})", username, id);

    if username.trim().is_empty() || name.trim().is_empty() || raw_password.is_empty() {
        return Err(AppError::Validation(
            "username, name e password são obrigatórios".into(),
        ));
    }
    if let Some(bad) = roles
        .iter()
        .find(|r| !DEFINED_ROLES.iter().any(|d| d.eq_ignore_ascii_case(r)))
    {
        return Err(AppError::Validation(format!("role desconhecida: {}", bad)));
    }

    let password_hash = crate::services::auth_service::hash_password(raw_password, bcrypt_cost).await?;

    let mut tx = db_pool.begin().await?;

    let insert_result = sqlx::query(
        "INSERT INTO users (id, username, password_hash, name) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(id)
    .bind(username.trim())
    .bind(&password_hash)
    .bind(name.trim())
    .execute(&mut *tx)
    .await;

    if let Err(sqlx::Error::Database(db_err)) = &insert_result {
        if db_err.is_unique_violation() {
            tracing::warn!("Falha ao criar user: ID {} ou username '{}' já existe.", id, username);
            tx.rollback().await?;
            return Err(AppError::AlreadyExists(format!(
                "utilizador {} / '{}'",
                id, username
            )));
        }
    }
    insert_result?;

    for role in roles {
        sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)")
            .bind(id)
            .bind(role.to_ascii_lowercase())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    tracing::info!("✅ Utilizador '{}' criado com sucesso.", username);

    find_user_by_id(db_pool, id)
        .await?
        .ok_or(AppError::InternalServerError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    #[tokio::test]
    async fn create_user_with_roles() {
        let pool = create_memory_pool().await.unwrap();
        let roles = vec!["admin".to_string(), "Lecturer".to_string()];
        let user = create_user(&pool, UserId(1), "root", "Admin", "pw", &roles, 4)
            .await
            .unwrap();
        assert_eq!(user.username, "root");

        assert_eq!(
            get_user_roles(&pool, UserId(1)).await.unwrap(),
            vec!["admin".to_string(), "lecturer".to_string()]
        );
        assert!(is_admin(&pool, UserId(1)).await.unwrap());
        assert!(find_user_by_id(&pool, UserId(1)).await.unwrap().is_some());
        assert!(find_user_by_id(&pool, UserId(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_and_invalid_users_are_rejected() {
        let pool = create_memory_pool().await.unwrap();
        create_user(&pool, UserId(1), "root", "Admin", "pw", &[], 4)
            .await
            .unwrap();

        assert!(matches!(
            create_user(&pool, UserId(1), "other", "Other", "pw", &[], 4).await,
            Err(AppError::AlreadyExists(_))
        ));
        assert!(matches!(
            create_user(&pool, UserId(2), "x", "X", "pw", &["wizard".to_string()], 4).await,
            Err(AppError::Validation(_))
        ));
    }
}
