//! Registry server: loads config from env, ensures the database and tables exist, serves the API.

use cadastro_api::{app, apply_migrations, connect, ensure_database_exists, AppConfig, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cadastro_api=info,cadastro_server=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    ensure_database_exists(&config.database_url).await?;
    let pool = connect(&config).await?;
    apply_migrations(&pool).await?;

    let bind_addr = config.bind_addr;
    let state = AppState::new(pool, config);
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
