//! Standard response envelope helpers.

use crate::pagination::Page;
use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Single-record envelope: `{ "dados": ... }`.
#[derive(Serialize)]
pub struct Dados<T> {
    pub dados: T,
}

pub fn ok<T: Serialize>(dados: T) -> (StatusCode, Json<Dados<T>>) {
    (StatusCode::OK, Json(Dados { dados }))
}

pub fn created<T: Serialize>(dados: T) -> (StatusCode, Json<Dados<T>>) {
    (StatusCode::CREATED, Json(Dados { dados }))
}

/// Paginated listings are returned as the bare envelope.
pub fn page(result: Page) -> (StatusCode, Json<Page>) {
    (StatusCode::OK, Json(result))
}
