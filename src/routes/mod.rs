//! Routers: common endpoints at the root, registry API under `/api/v1`.

mod common;
mod resource;

pub use common::common_routes;
pub use resource::resource_routes;

use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

pub const API_PREFIX: &str = "/api/v1";

/// Full application router.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;
    Router::new()
        .merge(common_routes(state.clone()))
        .nest(API_PREFIX, resource_routes(state).layer(RequestBodyLimitLayer::new(body_limit)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    /// State with a lazy pool: requests rejected before any statement never open a connection.
    fn lazy_state() -> AppState {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/cadastro_test")
            .unwrap();
        AppState::new(pool, AppConfig::default())
    }

    async fn send(method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let res = app(lazy_state()).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), 64 * 1024).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_unknown_resource_is_404_envelope() {
        let (status, body) = send("GET", "/api/v1/planetas", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["erro"], "registro não encontrado");
        assert_eq!(body["motivo"], "recurso planetas");
    }

    #[tokio::test]
    async fn test_invalid_id_is_400() {
        let (status, body) = send("GET", "/api/v1/candidatos/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["motivo"].as_str().unwrap().contains("abc"));
    }

    #[tokio::test]
    async fn test_create_rejects_non_object_and_invalid_fields() {
        let (status, _) = send("POST", "/api/v1/salas", Some("[1,2]")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send("POST", "/api/v1/candidatos", Some(r#"{"cpf": "123"}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["erro"], "dados inválidos");
    }

    #[tokio::test]
    async fn test_attachments_only_for_owners() {
        let (status, _) = send("GET", "/api/v1/salas/1/enderecos", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send("GET", "/api/v1/candidatos/1/telefones", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_address_rejected_before_database() {
        let (status, body) = send("POST", "/api/v1/candidatos/1/enderecos", Some(r#"{"cep": "123"}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["motivo"], "cep deve ter 8 dígitos");
    }
}
