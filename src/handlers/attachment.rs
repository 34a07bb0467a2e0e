//! Address and contact handlers under `/:resource/:id/:kind`.

use crate::error::AppError;
use crate::handlers::resource::{body_to_map, parse_id, resolve};
use crate::pagination::PageRequest;
use crate::response;
use crate::service::{AttachmentKind, AttachmentService, Owner};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

fn parse_kind(segment: &str) -> Result<AttachmentKind, AppError> {
    AttachmentKind::from_path(segment).ok_or_else(|| AppError::NotFound(format!("recurso {}", segment)))
}

fn parse_ativo(params: &HashMap<String, String>) -> Result<Option<bool>, AppError> {
    match params.get("ativo").map(|s| s.trim().to_lowercase()) {
        None => Ok(None),
        Some(s) if s == "true" => Ok(Some(true)),
        Some(s) if s == "false" => Ok(Some(false)),
        Some(s) => Err(AppError::BadRequest(format!("ativo inválido: {}", s))),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path((path_segment, owner_id, kind)): Path<(String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let owner = Owner::new(resolve(&path_segment)?, parse_id(&owner_id)?)?;
    let kind = parse_kind(&kind)?;
    let page = PageRequest::from_query(&params, state.config.default_page_limit);
    let ativo = parse_ativo(&params)?;
    let result = AttachmentService::list(&state.pool, kind, &owner, ativo, page).await?;
    Ok(response::page(result))
}

pub async fn create(
    State(state): State<AppState>,
    Path((path_segment, owner_id, kind)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let owner = Owner::new(resolve(&path_segment)?, parse_id(&owner_id)?)?;
    let kind = parse_kind(&kind)?;
    let body = body_to_map(body)?;
    let row = AttachmentService::create(&state.pool, kind, &owner, body).await?;
    Ok(response::created(row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, owner_id, kind, child_id)): Path<(String, String, String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let owner = Owner::new(resolve(&path_segment)?, parse_id(&owner_id)?)?;
    let kind = parse_kind(&kind)?;
    let child_id = parse_id(&child_id)?;
    let body = body_to_map(body)?;
    let row = AttachmentService::update(&state.pool, kind, &owner, child_id, body).await?;
    Ok(response::ok(row))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, owner_id, kind, child_id)): Path<(String, String, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let owner = Owner::new(resolve(&path_segment)?, parse_id(&owner_id)?)?;
    let kind = parse_kind(&kind)?;
    let child_id = parse_id(&child_id)?;
    AttachmentService::remove(&state.pool, kind, &owner, child_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
