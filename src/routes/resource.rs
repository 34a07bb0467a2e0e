//! Resource CRUD routes plus owned addresses/contacts.
//! Uses parameterized paths; handlers resolve the resource by its path segment.

use crate::handlers::{attachment, resource};
use crate::state::AppState;
use axum::{routing::get, routing::put, Router};

pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route("/:resource", get(resource::list).post(resource::create))
        .route(
            "/:resource/:id",
            get(resource::read).put(resource::update).delete(resource::delete),
        )
        .route("/:resource/:id/:kind", get(attachment::list).post(attachment::create))
        .route(
            "/:resource/:id/:kind/:child_id",
            put(attachment::update).delete(attachment::delete),
        )
        .with_state(state)
}
