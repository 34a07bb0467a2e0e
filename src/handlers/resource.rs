//! Resource CRUD handlers: list, read, create, update, delete.

use crate::error::AppError;
use crate::pagination::PageRequest;
use crate::resources::{resource_by_path, Resource};
use crate::response;
use crate::service::{RequestValidator, ResourceService};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Query parameters that are never treated as column filters.
const RESERVED_PARAMS: &[&str] = &["page", "limit", "busca"];

pub(crate) fn resolve(path_segment: &str) -> Result<&'static Resource, AppError> {
    resource_by_path(path_segment).ok_or_else(|| AppError::NotFound(format!("recurso {}", path_segment)))
}

pub(crate) fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| AppError::BadRequest(format!("id inválido: {}", id_str)))
}

pub(crate) fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("o corpo deve ser um objeto JSON".into())),
    }
}

fn column_filters(params: &HashMap<String, String>) -> Vec<(String, String)> {
    let mut filters: Vec<(String, String)> = params
        .iter()
        .filter(|(k, _)| !RESERVED_PARAMS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    // HashMap order is random; keep placeholder numbering stable across requests.
    filters.sort();
    filters
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&path_segment)?;
    let page = PageRequest::from_query(&params, state.config.default_page_limit);
    let filters = column_filters(&params);
    let busca = params.get("busca").map(String::as_str);
    let result = ResourceService::list(&state.pool, entity, &filters, busca, page).await?;
    Ok(response::page(result))
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&path_segment)?;
    let id = parse_id(&id_str)?;
    let row = ResourceService::read(&state.pool, entity, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", entity.path, id)))?;
    Ok(response::ok(row))
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&path_segment)?;
    let body = body_to_map(body)?;
    RequestValidator::validate(&body, entity.rules)?;
    let row = ResourceService::create(&state.pool, entity, &body).await?;
    Ok(response::created(row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&path_segment)?;
    let id = parse_id(&id_str)?;
    let body = body_to_map(body)?;
    RequestValidator::validate_partial(&body, entity.rules)?;
    let row = ResourceService::update(&state.pool, entity, id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", entity.path, id)))?;
    Ok(response::ok(row))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&path_segment)?;
    let id = parse_id(&id_str)?;
    if !ResourceService::delete(&state.pool, entity, id).await? {
        return Err(AppError::NotFound(format!("{} {}", entity.path, id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
