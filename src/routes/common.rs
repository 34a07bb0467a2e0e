//! Operational endpoints mounted at the root: liveness, readiness against the registry schema,
//! and build information.

use crate::resources::RESOURCES;
use crate::routes::API_PREFIX;
use crate::service::ATTACHMENT_KINDS;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::PgPool;

#[derive(Serialize, Debug, PartialEq, Eq)]
struct Readiness {
    status: &'static str,
    banco: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tabelas_ausentes: Vec<&'static str>,
}

/// Every table the API reads from: one per resource plus the attachment tables.
fn registry_tables() -> Vec<&'static str> {
    RESOURCES
        .iter()
        .map(|r| r.table)
        .chain(ATTACHMENT_KINDS.iter().map(|k| k.table()))
        .collect()
}

/// Registry tables not present in the connected database.
async fn missing_tables(pool: &PgPool) -> Result<Vec<&'static str>, sqlx::Error> {
    let tables = registry_tables();
    let names: Vec<String> = tables.iter().map(|t| t.to_string()).collect();
    let present: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::text FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = ANY($1)",
    )
    .bind(names)
    .fetch_all(pool)
    .await?;
    Ok(tables
        .into_iter()
        .filter(|t| !present.iter().any(|p| p == t))
        .collect())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// 200 once the database answers and the registry schema is in place; 503 otherwise.
async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    match missing_tables(&state.pool).await {
        Ok(missing) if missing.is_empty() => (
            StatusCode::OK,
            Json(Readiness {
                status: "ok",
                banco: "ok",
                tabelas_ausentes: missing,
            }),
        ),
        Ok(missing) => {
            tracing::warn!(?missing, "registry schema incomplete");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Readiness {
                    status: "indisponivel",
                    banco: "ok",
                    tabelas_ausentes: missing,
                }),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Readiness {
                    status: "indisponivel",
                    banco: "inacessivel",
                    tabelas_ausentes: Vec::new(),
                }),
            )
        }
    }
}

async fn version() -> Json<Value> {
    let recursos: Vec<&str> = RESOURCES.iter().map(|r| r.path).collect();
    Json(json!({
        "nome": env!("CARGO_PKG_NAME"),
        "versao": env!("CARGO_PKG_VERSION"),
        "api": API_PREFIX,
        "recursos": recursos,
    }))
}

/// GET /health, GET /ready, GET /version.
pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Pool pointed at a closed port: every acquire fails quickly.
    fn unreachable_state() -> AppState {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy("postgres://cadastro@127.0.0.1:1/cadastro_test")
            .unwrap();
        AppState::new(pool, AppConfig::default())
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let res = common_routes(unreachable_state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), 64 * 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_registry_tables_cover_resources_and_attachments() {
        let tables = registry_tables();
        assert_eq!(tables.len(), RESOURCES.len() + ATTACHMENT_KINDS.len());
        assert!(tables.contains(&"candidato"));
        assert!(tables.contains(&"endereco"));
        assert!(tables.contains(&"contato"));
    }

    #[tokio::test]
    async fn test_health_needs_no_database() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_version_lists_resources() {
        let (status, body) = get_json("/version").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["nome"], env!("CARGO_PKG_NAME"));
        assert_eq!(body["api"], API_PREFIX);
        assert_eq!(body["recursos"].as_array().map(Vec::len), Some(RESOURCES.len()));
    }

    #[tokio::test]
    async fn test_ready_reports_unreachable_database() {
        let (status, body) = get_json("/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "indisponivel");
        assert_eq!(body["banco"], "inacessivel");
        assert!(body.get("tabelas_ausentes").is_none());
    }
}
