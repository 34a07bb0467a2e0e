//! Generic CRUD execution against PostgreSQL for registry resources.

use crate::error::AppError;
use crate::pagination::{paginate, paginate_with_address, Page, PageRequest, RowSource, ENDERECO};
use crate::resources::Resource;
use crate::service::attachment::ATTACHMENT_KINDS;
use crate::sql::{delete, insert, list_query, row_to_json, select_by_id, update, QueryBuf, SqlParam};
use serde_json::{Map, Value};
use sqlx::{Executor, PgPool, Postgres};

pub struct ResourceService;

impl ResourceService {
    /// Paginated listing. Address owners get their principal address nested under `endereco`.
    pub async fn list(
        pool: &PgPool,
        entity: &Resource,
        filters: &[(String, String)],
        busca: Option<&str>,
        page: PageRequest,
    ) -> Result<Page, AppError> {
        let q = list_query(entity, filters, busca);
        let result = if entity.owns_attachments() {
            paginate_with_address(pool, &q.page_sql(), &q.count_sql(), q.params(), page.page, page.limit, &ENDERECO)
                .await?
        } else {
            paginate(pool, &q.page_sql(), &q.count_sql(), q.params(), page.page, page.limit).await?
        };
        Ok(result)
    }

    /// Fetch one row by primary key. Returns JSON object or None.
    pub async fn read(pool: &PgPool, entity: &Resource, id: i64) -> Result<Option<Value>, AppError> {
        let rows = pool.rows(&select_by_id(entity), &[SqlParam::I64(id)]).await?;
        Ok(rows.into_iter().next().map(|row| {
            if entity.owns_attachments() {
                ENDERECO.nest(row)
            } else {
                row
            }
        }))
    }

    /// Insert one row from the writable columns of `body`. Returns the created row.
    pub async fn create(pool: &PgPool, entity: &Resource, body: &Map<String, Value>) -> Result<Value, AppError> {
        let q = insert(entity, body).ok_or_else(|| no_writable_columns(entity))?;
        let id = fetch_id(pool, &q).await?.ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        tracing::info!(resource = entity.path, id, "created");
        Self::read(pool, entity, id)
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    /// Update one row by id. Returns updated row, None when the id does not exist.
    pub async fn update(
        pool: &PgPool,
        entity: &Resource,
        id: i64,
        body: &Map<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let q = update(entity, id, body).ok_or_else(|| no_writable_columns(entity))?;
        if fetch_id(pool, &q).await?.is_none() {
            return Ok(None);
        }
        Self::read(pool, entity, id).await
    }

    /// Delete one row by id, together with the addresses and contacts it owns.
    /// Returns false when the id does not exist.
    pub async fn delete(pool: &PgPool, entity: &Resource, id: i64) -> Result<bool, AppError> {
        let mut tx = pool.begin().await?;
        if let Some(kind) = entity.owner_kind {
            for attachment in ATTACHMENT_KINDS {
                let sql = format!(
                    "DELETE FROM \"{}\" WHERE \"tipo_dono\" = $1 AND \"id_dono\" = $2",
                    attachment.table()
                );
                execute(&mut *tx, &sql, &[SqlParam::from(kind), SqlParam::I64(id)]).await?;
            }
        }
        let q = QueryBuf {
            sql: delete(entity),
            params: vec![SqlParam::I64(id)],
        };
        let deleted = fetch_id(&mut *tx, &q).await?.is_some();
        tx.commit().await?;
        if deleted {
            tracing::info!(resource = entity.path, id, "deleted");
        }
        Ok(deleted)
    }
}

fn no_writable_columns(entity: &Resource) -> AppError {
    AppError::Validation(format!(
        "nenhum campo gravável informado; campos aceitos: {}",
        entity.columns.iter().map(|c| c.name).collect::<Vec<_>>().join(", ")
    ))
}

/// Run a statement returning a single id column; None when no row came back.
pub(crate) async fn fetch_id<'c, E>(exec: E, q: &QueryBuf) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    query.fetch_optional(exec).await
}

pub(crate) async fn fetch_optional<'c, E>(exec: E, sql: &str, params: &[SqlParam]) -> Result<Option<Value>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %sql, params = ?params, "query");
    let mut query = sqlx::query(sql);
    for p in params {
        query = query.bind(p.clone());
    }
    let row = query.fetch_optional(exec).await?;
    Ok(row.map(|r| row_to_json(&r)))
}

pub(crate) async fn execute<'c, E>(exec: E, sql: &str, params: &[SqlParam]) -> Result<u64, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %sql, params = ?params, "execute");
    let mut query = sqlx::query(sql);
    for p in params {
        query = query.bind(p.clone());
    }
    Ok(query.execute(exec).await?.rows_affected())
}
