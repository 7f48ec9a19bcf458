// src/services/directory_service.rs
// Diretório de docentes e alunos, e pertença às turmas.
use crate::{
    error::{AppError, AppResult},
    models::{
        catalog::{Lecturer, NewLecturer, NewStudent, Student},
        ids::{self, UserId},
    },
};
use sqlx::SqlitePool;

const LECTURER_COLUMNS: &str = "id, user_id, employee_number, name";
const STUDENT_COLUMNS: &str = "id, user_id, student_number, name";

// --- Docentes ---

/// Estratégias de procura de um docente, pela ordem em que são tentadas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructorLookup {
    ByUserId,
    ByInternalId,
    ByEmployeeNumber,
}

impl InstructorLookup {
    pub const CHAIN: [InstructorLookup; 3] = [
        InstructorLookup::ByUserId,
        InstructorLookup::ByInternalId,
        InstructorLookup::ByEmployeeNumber,
    ];

    /// Aplica só esta estratégia.
    pub async fn find(self, db_pool: &SqlitePool, key: i64) -> AppResult<Option<Lecturer>> {
        let column = match self {
            InstructorLookup::ByUserId => "user_id",
            InstructorLookup::ByInternalId => "id",
            InstructorLookup::ByEmployeeNumber => "employee_number",
        };
        let sql = format!("SELECT {} FROM lecturers WHERE {} = ?1", LECTURER_COLUMNS, column);
        let query = sqlx::query_as::<_, Lecturer>(&sql);
        // employee_number é TEXT: compara com a forma textual
        let query = match self {
            InstructorLookup::ByEmployeeNumber => query.bind(key.to_string()),
            _ => query.bind(key),
        };
        Ok(query.fetch_optional(db_pool).await?)
    }
}

/// Percorre a cadeia `ByUserId -> ByInternalId -> ByEmployeeNumber`; o primeiro que encontrar ganha.
pub async fn lookup_lecturer(db_pool: &SqlitePool, key: i64) -> AppResult<Option<Lecturer>> {
    for strategy in InstructorLookup::CHAIN {
        if let Some(lecturer) = strategy.find(db_pool, key).await? {
            tracing::debug!("Docente {} encontrado via {:?}", key, strategy);
            return Ok(Some(lecturer));
        }
    }
    tracing::debug!("Docente {} não encontrado no diretório", key);
    Ok(None)
}

/// Como `lookup_lecturer`, mas devolve a identidade externa e falha com `NotFound`.
pub async fn resolve_lecturer_user(db_pool: &SqlitePool, key: i64) -> AppResult<UserId> {
    let lecturer = lookup_lecturer(db_pool, key)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("docente {} no diretório", key)))?;
    if lecturer.user_id.0 != key {
        tracing::debug!("Docente {} resolvido para {}", key, lecturer.user_id);
    }
    Ok(lecturer.user_id)
}

pub async fn find_lecturer_by_user_id(db_pool: &SqlitePool, user_id: UserId) -> AppResult<Option<Lecturer>> {
    InstructorLookup::ByUserId.find(db_pool, user_id.0).await
}

pub async fn create_lecturer(db_pool: &SqlitePool, new: &NewLecturer) -> AppResult<Lecturer> {
    let user_id = new.user_id.user_id("user_id")?;
    if new.employee_number.trim().is_empty() || new.name.trim().is_empty() {
        return Err(AppError::Validation(
            "employee_number e name são obrigatórios".into(),
        ));
    }

    let result = sqlx::query_as::<_, Lecturer>(&format!(
        "INSERT INTO lecturers (user_id, employee_number, name) VALUES (?1, ?2, ?3) RETURNING {}",
        LECTURER_COLUMNS
    ))
    .bind(user_id)
    .bind(new.employee_number.trim())
    .bind(new.name.trim())
    .fetch_one(db_pool)
    .await;

    match result {
        Ok(lecturer) => {
            tracing::info!("Docente {} ({}) registado.", lecturer.name, lecturer.user_id);
            Ok(lecturer)
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            AppError::AlreadyExists(format!("docente {} / {}", user_id, new.employee_number)),
        ),
        Err(e) => Err(e.into()),
    }
}

pub async fn list_lecturers(db_pool: &SqlitePool) -> AppResult<Vec<Lecturer>> {
    Ok(sqlx::query_as::<_, Lecturer>(&format!(
        "SELECT {} FROM lecturers ORDER BY name",
        LECTURER_COLUMNS
    ))
    .fetch_all(db_pool)
    .await?)
}

// --- Alunos ---

pub async fn create_student(db_pool: &SqlitePool, new: &NewStudent) -> AppResult<Student> {
    let user_id = ids::parse_optional(new.user_id.as_ref(), "user_id")?.map(UserId);
    if new.student_number.trim().is_empty() || new.name.trim().is_empty() {
        return Err(AppError::Validation(
            "student_number e name são obrigatórios".into(),
        ));
    }

    let result = sqlx::query_as::<_, Student>(&format!(
        "INSERT INTO students (user_id, student_number, name) VALUES (?1, ?2, ?3) RETURNING {}",
        STUDENT_COLUMNS
    ))
    .bind(user_id)
    .bind(new.student_number.trim())
    .bind(new.name.trim())
    .fetch_one(db_pool)
    .await;

    match result {
        Ok(student) => Ok(student),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            AppError::AlreadyExists(format!("aluno {}", new.student_number)),
        ),
        Err(e) => Err(e.into()),
    }
}

pub async fn find_student_by_id(db_pool: &SqlitePool, id: i64) -> AppResult<Option<Student>> {
    Ok(sqlx::query_as::<_, Student>(&format!(
        "SELECT {} FROM students WHERE id = ?1",
        STUDENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db_pool)
    .await?)
}

/// Aluno associado a uma conta de utilizador.
pub async fn find_student_by_user_id(db_pool: &SqlitePool, user_id: UserId) -> AppResult<Option<Student>> {
    Ok(sqlx::query_as::<_, Student>(&format!(
        "SELECT {} FROM students WHERE user_id = ?1",
        STUDENT_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(db_pool)
    .await?)
}

pub async fn list_students(db_pool: &SqlitePool) -> AppResult<Vec<Student>> {
    Ok(sqlx::query_as::<_, Student>(&format!(
        "SELECT {} FROM students ORDER BY student_number",
        STUDENT_COLUMNS
    ))
    .fetch_all(db_pool)
    .await?)
}

// --- Pertença às turmas ---

/// Junta alunos a uma turma numa transação. Alunos já presentes são ignorados.
/// Devolve quantos foram efetivamente adicionados.
pub async fn add_members(db_pool: &SqlitePool, group_id: i64, student_ids: &[i64]) -> AppResult<u64> {
    let group_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM student_groups WHERE id = ?1)")
            .bind(group_id)
            .fetch_one(db_pool)
            .await?;
    if !group_exists {
        return Err(AppError::NotFound(format!("turma {}", group_id)));
    }

    let mut tx = db_pool.begin().await?;
    let mut added = 0;
    for student_id in student_ids {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM students WHERE id = ?1)")
            .bind(student_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!("aluno {}", student_id)));
        }
        added += sqlx::query(
            "INSERT OR IGNORE INTO student_group_members (student_group_id, student_id) VALUES (?1, ?2)",
        )
        .bind(group_id)
        .bind(student_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }
    tx.commit().await?;

    tracing::info!("{} aluno(s) adicionados à turma {}", added, group_id);
    Ok(added)
}

/// Ids internos dos alunos atualmente na turma.
pub async fn list_group_student_ids(db_pool: &SqlitePool, group_id: i64) -> AppResult<Vec<i64>> {
    Ok(sqlx::query_scalar(
        "SELECT student_id FROM student_group_members WHERE student_group_id = ?1 ORDER BY student_id",
    )
    .bind(group_id)
    .fetch_all(db_pool)
    .await?)
}

pub async fn is_member(db_pool: &SqlitePool, group_id: i64, student_id: i64) -> AppResult<bool> {
    Ok(sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM student_group_members WHERE student_group_id = ?1 AND student_id = ?2)",
    )
    .bind(group_id)
    .bind(student_id)
    .fetch_one(db_pool)
    .await?)
}

pub async fn count_members(db_pool: &SqlitePool, group_id: i64) -> AppResult<i64> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM student_group_members WHERE student_group_id = ?1")
            .bind(group_id)
            .fetch_one(db_pool)
            .await?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::create_memory_pool,
        models::{catalog::NewStudentGroup, ids::RawId},
        services::catalog_service,
    };

    async fn lecturer(pool: &SqlitePool, user_id: i64, employee_number: &str) -> Lecturer {
        create_lecturer(
            pool,
            &NewLecturer {
                user_id: RawId::from(user_id),
                employee_number: employee_number.into(),
                name: format!("Dosen {}", user_id),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn each_lookup_strategy_works_on_its_own() {
        let pool = create_memory_pool().await.unwrap();
        let l = lecturer(&pool, 5106, "198001").await;

        let by_user = InstructorLookup::ByUserId.find(&pool, 5106).await.unwrap();
        assert_eq!(by_user.unwrap().id, l.id);

        let by_internal = InstructorLookup::ByInternalId.find(&pool, l.id).await.unwrap();
        assert_eq!(by_internal.unwrap().user_id, UserId(5106));

        let by_number = InstructorLookup::ByEmployeeNumber.find(&pool, 198001).await.unwrap();
        assert_eq!(by_number.unwrap().id, l.id);

        assert!(InstructorLookup::ByUserId.find(&pool, 198001).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn chain_prefers_user_id_over_internal_id() {
        let pool = create_memory_pool().await.unwrap();
        // Docente A tem id interno 1; docente B tem user_id 1.
        let a = lecturer(&pool, 5106, "E-1").await;
        let b = lecturer(&pool, a.id, "E-2").await;

        let found = lookup_lecturer(&pool, a.id).await.unwrap().unwrap();
        assert_eq!(found.id, b.id);

        let found = lookup_lecturer(&pool, 5106).await.unwrap().unwrap();
        assert_eq!(found.id, a.id);
        assert!(lookup_lecturer(&pool, 424242).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn membership() {
        let pool = create_memory_pool().await.unwrap();
        let group = catalog_service::create_group(
            &pool,
            &NewStudentGroup { name: "TI-1A".into(), program: None, semester: Some(1) },
        )
        .await
        .unwrap();
        let s1 = create_student(
            &pool,
            &NewStudent { user_id: Some(RawId::Text("9001".into())), student_number: "2401".into(), name: "Ani".into() },
        )
        .await
        .unwrap();
        let s2 = create_student(
            &pool,
            &NewStudent { user_id: None, student_number: "2402".into(), name: "Budi".into() },
        )
        .await
        .unwrap();

        assert_eq!(add_members(&pool, group.id, &[s1.id, s2.id]).await.unwrap(), 2);
        assert_eq!(add_members(&pool, group.id, &[s1.id]).await.unwrap(), 0);
        assert!(matches!(
            add_members(&pool, group.id, &[999]).await,
            Err(AppError::NotFound(_))
        ));

        assert_eq!(list_group_student_ids(&pool, group.id).await.unwrap(), vec![s1.id, s2.id]);
        assert!(is_member(&pool, group.id, s2.id).await.unwrap());
        assert_eq!(count_members(&pool, group.id).await.unwrap(), 2);

        let by_user = find_student_by_user_id(&pool, UserId(9001)).await.unwrap().unwrap();
        assert_eq!(by_user.id, s1.id);
    }
}
