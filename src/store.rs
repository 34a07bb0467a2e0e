//! Database bootstrap: create the target database when missing and open the shared pool.

use crate::config::AppConfig;
use crate::error::{AppError, ConfigError};
use crate::sql::quoted;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;

/// Connect to the server's `postgres` database and `CREATE DATABASE` the one named in
/// `database_url` if it does not exist. No-op when the URL targets `postgres` itself.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = PgConnectOptions::from_str(&admin_url).map_err(|e| ConfigError::DatabaseUrl(e.to_string()))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// The pool shared by every request; handlers receive it through `AppState`.
pub async fn connect(config: &AppConfig) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

/// Split a URL into (URL of the `postgres` admin database, target database name).
fn parse_db_name_from_url(url: &str) -> Result<(String, String), ConfigError> {
    let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
    let path_start = url[scheme_end..]
        .find('/')
        .map(|i| scheme_end + i + 1)
        .ok_or_else(|| ConfigError::DatabaseUrl("no database path".into()))?;
    let path_and_query = &url[path_start..];
    let (db_name, query) = match path_and_query.split_once('?') {
        Some((name, q)) => (name.trim(), Some(q)),
        None => (path_and_query.trim(), None),
    };
    let base = &url[..path_start];
    let admin_url = match query {
        Some(q) => format!("{}postgres?{}", base, q),
        None => format!("{}postgres", base),
    };
    Ok((admin_url, db_name.to_string()))
}
