//! Cadastro API: REST backend for a candidate/institution registry on PostgreSQL.

pub mod config;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod pagination;
pub mod resources;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::AppConfig;
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use pagination::{paginate, paginate_with_address, Page, PageRequest, RowSource};
pub use routes::{app, common_routes, resource_routes};
pub use state::AppState;
pub use store::{connect, ensure_database_exists};
