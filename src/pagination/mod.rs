//! Generic pagination over a count statement and a page statement.
//!
//! The helper executes the count query, then the page query with `LIMIT`/`OFFSET` appended as
//! bound parameters numbered after the caller's own, and returns the `{ dados, total, page,
//! totalPaginas }` envelope. It never clamps page/limit and never translates errors: any
//! `sqlx::Error` is returned as-is and no envelope is produced.
//!
//! The two statements do not share a snapshot; a write landing between them can make `total`
//! disagree with what the page query returns.

pub mod address;

use crate::sql::{row_to_json, SqlParam};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;

pub use address::{AddressLayout, ADDRESS_KEY, ENDERECO};

pub const DEFAULT_PAGE: i64 = 1;

/// Anything that can run a parameterized count and a parameterized row query.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Run a statement returning a single integer (first column of the first row).
    async fn count(&self, sql: &str, params: &[SqlParam]) -> Result<i64, sqlx::Error>;

    /// Run a statement and map every row to a JSON object.
    async fn rows(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Value>, sqlx::Error>;
}

#[async_trait]
impl RowSource for PgPool {
    async fn count(&self, sql: &str, params: &[SqlParam]) -> Result<i64, sqlx::Error> {
        tracing::debug!(sql = %sql, params = ?params, "count");
        let mut query = sqlx::query_scalar::<_, i64>(sql);
        for p in params {
            query = query.bind(p.clone());
        }
        query.fetch_one(self).await
    }

    async fn rows(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Value>, sqlx::Error> {
        tracing::debug!(sql = %sql, params = ?params, "query");
        let mut query = sqlx::query(sql);
        for p in params {
            query = query.bind(p.clone());
        }
        let rows = query.fetch_all(self).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }
}

/// Result envelope of a paginated listing.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Page<T = Value> {
    pub dados: Vec<T>,
    pub total: i64,
    pub page: i64,
    #[serde(rename = "totalPaginas")]
    pub total_paginas: i64,
}

impl<T> Page<T> {
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            dados: self.dados.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            total_paginas: self.total_paginas,
        }
    }
}

/// `ceil(total / limit)`; 0 when there are no rows. A non-positive limit also reports 0 pages.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 || total <= 0 {
        return 0;
    }
    total / limit + i64::from(total % limit != 0)
}

pub fn offset_for(page: i64, limit: i64) -> i64 {
    page.saturating_sub(1).saturating_mul(limit)
}

/// Execute `count_sql` then `page_sql` (with `LIMIT $n+1 OFFSET $n+2` appended, n = params.len())
/// and build the envelope. `page_sql` must not carry its own LIMIT/OFFSET.
pub async fn paginate<S>(
    source: &S,
    page_sql: &str,
    count_sql: &str,
    params: &[SqlParam],
    page: i64,
    limit: i64,
) -> Result<Page, sqlx::Error>
where
    S: RowSource + ?Sized,
{
    let total = source.count(count_sql, params).await?;
    let offset = offset_for(page, limit);

    let n = params.len();
    let sql = format!("{} LIMIT ${} OFFSET ${}", page_sql, n + 1, n + 2);
    let mut bound = Vec::with_capacity(n + 2);
    bound.extend_from_slice(params);
    bound.push(SqlParam::I64(limit));
    bound.push(SqlParam::I64(offset));

    let dados = source.rows(&sql, &bound).await?;
    Ok(Page {
        dados,
        total,
        page,
        total_paginas: total_pages(total, limit),
    })
}

/// Same as [`paginate`], then nests each row's address columns under `endereco` per `layout`.
pub async fn paginate_with_address<S>(
    source: &S,
    page_sql: &str,
    count_sql: &str,
    params: &[SqlParam],
    page: i64,
    limit: i64,
    layout: &AddressLayout,
) -> Result<Page, sqlx::Error>
where
    S: RowSource + ?Sized,
{
    let result = paginate(source, page_sql, count_sql, params, page, limit).await?;
    Ok(result.map(|row| layout.nest(row)))
}

/// Page and limit as requested by a listing endpoint, after coercion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Read `page` and `limit` from query parameters. Missing, non-numeric, zero or negative values
    /// fall back to page 1 and `default_limit`.
    pub fn from_query(params: &HashMap<String, String>, default_limit: i64) -> Self {
        PageRequest {
            page: positive_or(params.get("page"), DEFAULT_PAGE),
            limit: positive_or(params.get("limit"), default_limit),
        }
    }
}

fn positive_or(raw: Option<&String>, default: i64) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}
