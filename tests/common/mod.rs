//! Shared helpers for the database-backed integration tests.
//!
//! Run with: `DATABASE_URL=postgres://... cargo test -- --ignored`

#![allow(dead_code)]

use cadastro_api::apply_migrations;
use cadastro_api::resources::{resource_by_path, Resource};
use cadastro_api::service::{AttachmentKind, Owner, ResourceService};
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::env;
use uuid::Uuid;

/// Pool on `DATABASE_URL` with the registry schema applied. The database itself must exist.
pub async fn create_test_pool() -> PgPool {
    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/cadastro_test".to_string());
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    apply_migrations(&pool).await.expect("Failed to apply migrations");
    pool
}

pub fn resource(path: &str) -> &'static Resource {
    resource_by_path(path).expect("unknown resource")
}

pub fn obj(v: Value) -> Map<String, Value> {
    v.as_object().cloned().expect("not a JSON object")
}

/// Name unique to one test run, usable as a `busca` term.
pub fn unique_name(prefix: &str) -> String {
    format!("{} {}", prefix, Uuid::new_v4().simple())
}

pub async fn create_candidato(pool: &PgPool, nome: &str) -> i64 {
    let row = ResourceService::create(pool, resource("candidatos"), &obj(serde_json::json!({ "nome": nome })))
        .await
        .expect("Failed to create candidato");
    row["id_candidato"].as_i64().expect("id_candidato")
}

pub fn candidato_owner(id: i64) -> Owner<'static> {
    Owner::new(resource("candidatos"), id).expect("candidatos owns attachments")
}

/// Removes the candidato and, with it, its addresses and contacts.
pub async fn cleanup_candidato(pool: &PgPool, id: i64) {
    ResourceService::delete(pool, resource("candidatos"), id)
        .await
        .expect("Failed to delete candidato");
}

/// Number of rows of `kind` owned by candidato `id` that are active and principal.
pub async fn active_principals(pool: &PgPool, kind: AttachmentKind, id: i64) -> i64 {
    let sql = format!(
        "SELECT COUNT(*) FROM \"{}\" WHERE \"tipo_dono\" = 'candidato' AND \"id_dono\" = $1 AND \"ativo\" AND \"principal\"",
        kind.table()
    );
    sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("Failed to count principals")
}

/// `(id, principal, ativo)` for every row of `kind` owned by candidato `id`, oldest first.
pub async fn attachment_flags(pool: &PgPool, kind: AttachmentKind, id: i64) -> Vec<(i64, bool, bool)> {
    let sql = format!(
        "SELECT \"{pk}\", \"principal\", \"ativo\" FROM \"{t}\" WHERE \"tipo_dono\" = 'candidato' AND \"id_dono\" = $1 ORDER BY \"{pk}\"",
        pk = kind.pk(),
        t = kind.table()
    );
    sqlx::query_as(&sql)
        .bind(id)
        .fetch_all(pool)
        .await
        .expect("Failed to read attachment flags")
}
