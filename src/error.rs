//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
    #[error("invalid DATABASE_URL: {0}")]
    DatabaseUrl(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

/// Error envelope returned by every endpoint: `{ "erro": ..., "motivo": ... }`.
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub erro: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motivo: Option<String>,
}

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const NOT_NULL_VIOLATION: &str = "23502";
/// SQLSTATE class 22: bad casts, out-of-range numbers, malformed dates.
const DATA_EXCEPTION_CLASS: &str = "22";

fn db_code(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Status for a database error by SQLSTATE. Constraint clashes are 409; values the client sent
/// that PostgreSQL refused are 422.
fn status_for_sqlstate(code: Option<&str>) -> StatusCode {
    match code {
        Some(UNIQUE_VIOLATION) | Some(FOREIGN_KEY_VIOLATION) => StatusCode::CONFLICT,
        Some(NOT_NULL_VIOLATION) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(c) if c.starts_with(DATA_EXCEPTION_CLASS) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Db(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Db(e) => status_for_sqlstate(db_code(e).as_deref()),
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Short user-facing message. Database details go to `motivo`, never to `erro`.
    fn body(&self) -> ErrorBody {
        match self {
            AppError::Config(e) => ErrorBody {
                erro: "erro de configuração".into(),
                motivo: Some(e.to_string()),
            },
            AppError::NotFound(what) => ErrorBody {
                erro: "registro não encontrado".into(),
                motivo: Some(what.clone()),
            },
            AppError::Validation(msg) => ErrorBody {
                erro: "dados inválidos".into(),
                motivo: Some(msg.clone()),
            },
            AppError::Db(sqlx::Error::RowNotFound) => ErrorBody {
                erro: "registro não encontrado".into(),
                motivo: None,
            },
            AppError::Db(e) if self.status() == StatusCode::CONFLICT => ErrorBody {
                erro: "conflito".into(),
                motivo: Some(e.to_string()),
            },
            AppError::Db(e) if self.status() == StatusCode::UNPROCESSABLE_ENTITY => ErrorBody {
                erro: "dados inválidos".into(),
                motivo: Some(e.to_string()),
            },
            AppError::Db(e) => ErrorBody {
                erro: "erro ao acessar o banco de dados".into(),
                motivo: Some(e.to_string()),
            },
            AppError::Conflict(msg) => ErrorBody {
                erro: "conflito".into(),
                motivo: Some(msg.clone()),
            },
            AppError::BadRequest(msg) => ErrorBody {
                erro: "requisição inválida".into(),
                motivo: Some(msg.clone()),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::Db(sqlx::Error::RowNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Db(sqlx::Error::PoolTimedOut).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_sqlstate_mapping() {
        for code in ["22P02", "22007", "22008", "22003", "23502"] {
            assert_eq!(status_for_sqlstate(Some(code)), StatusCode::UNPROCESSABLE_ENTITY, "{}", code);
        }
        assert_eq!(status_for_sqlstate(Some("23505")), StatusCode::CONFLICT);
        assert_eq!(status_for_sqlstate(Some("23503")), StatusCode::CONFLICT);
        assert_eq!(status_for_sqlstate(Some("42P01")), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for_sqlstate(Some("2")), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for_sqlstate(None), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_body_shape() {
        let body = serde_json::to_value(AppError::Db(sqlx::Error::PoolTimedOut).body()).unwrap();
        assert_eq!(body["erro"], "erro ao acessar o banco de dados");
        assert!(body["motivo"].as_str().is_some());

        let body = serde_json::to_value(AppError::Db(sqlx::Error::RowNotFound).body()).unwrap();
        assert!(body.get("motivo").is_none());
    }
}
