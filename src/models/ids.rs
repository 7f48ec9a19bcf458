// src/models/ids.rs
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identidade externa de um utilizador (docente, assistente, aluno ou admin).
/// É o mesmo número usado nas atribuições, nos horários e em quem abre sessões.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identificador tal como chega no JSON: número inteiro, número com casa decimal
/// (ex: `5106.0`) ou texto numérico (ex: `"5106"`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawId {
    /// Normaliza para um id positivo; qualquer outra coisa é erro de validação
    /// (nunca cai silenciosamente para zero).
    pub fn parse(&self, field: &str) -> AppResult<i64> {
        let parsed = match self {
            RawId::Int(v) => Some(*v),
            RawId::Float(v) if v.fract() == 0.0 && v.is_finite() && v.abs() < 9.0e15 => {
                Some(*v as i64)
            }
            RawId::Float(_) => None,
            RawId::Text(s) => s.trim().parse::<i64>().ok(),
        };

        match parsed {
            Some(id) if id > 0 => Ok(id),
            _ => Err(AppError::Validation(format!(
                "{} deve ser um id numérico positivo",
                field
            ))),
        }
    }

    pub fn user_id(&self, field: &str) -> AppResult<UserId> {
        self.parse(field).map(UserId)
    }
}

impl From<i64> for RawId {
    fn from(v: i64) -> Self {
        RawId::Int(v)
    }
}

/// Versão para campos opcionais (`null`/ausente -> `None`).
pub fn parse_optional(raw: Option<&RawId>, field: &str) -> AppResult<Option<i64>> {
    raw.map(|r| r.parse(field)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawId {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        assert_eq!(raw("5106").parse("lecturer_id").unwrap(), 5106);
        assert_eq!(raw("\"5106\"").parse("lecturer_id").unwrap(), 5106);
        assert_eq!(raw("\" 42 \"").parse("lecturer_id").unwrap(), 42);
        assert_eq!(raw("7.0").parse("room_id").unwrap(), 7);
    }

    #[test]
    fn rejects_garbage_instead_of_defaulting_to_zero() {
        for bad in ["\"abc\"", "\"\"", "0", "-3", "7.5", "\"12x\""] {
            let err = raw(bad).parse("room_id").unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{} deveria falhar", bad);
        }
    }

    #[test]
    fn optional_ids() {
        assert_eq!(parse_optional(None, "x").unwrap(), None);
        assert_eq!(parse_optional(Some(&RawId::from(9)), "x").unwrap(), Some(9));
        assert!(parse_optional(Some(&RawId::Text("nope".into())), "x").is_err());
    }
}
