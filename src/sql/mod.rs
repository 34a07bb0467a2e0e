//! Safe SQL building: identifiers from code only, values as parameters.

mod builder;
mod list;
pub mod params;
pub mod row;
pub use builder::*;
pub use list::ListQuery;
pub use params::SqlParam;
pub use row::row_to_json;

/// Quote identifier for PostgreSQL (safe: only from code).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}
