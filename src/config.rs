//! Runtime configuration from environment (`.env` is loaded by the binary via dotenvy).

use crate::error::ConfigError;
use std::net::SocketAddr;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/cadastro";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    /// Page size used when a listing request omits `limit`.
    pub default_page_limit: i64,
    pub max_body_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Missing keys take defaults; present but unparsable keys fail.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
        let bind_addr = parse_or(&lookup, "BIND_ADDR", default_bind_addr)?;
        let max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", || DEFAULT_MAX_CONNECTIONS)?;
        let default_page_limit = parse_or(&lookup, "DEFAULT_PAGE_LIMIT", || DEFAULT_PAGE_LIMIT)?;
        if default_page_limit < 1 {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_PAGE_LIMIT",
                value: default_page_limit.to_string(),
            });
        }
        let max_body_bytes = parse_or(&lookup, "MAX_BODY_BYTES", || DEFAULT_MAX_BODY_BYTES)?;
        Ok(AppConfig {
            database_url,
            bind_addr,
            max_connections,
            default_page_limit,
            max_body_bytes,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: DEFAULT_DATABASE_URL.into(),
            bind_addr: default_bind_addr(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            default_page_limit: DEFAULT_PAGE_LIMIT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn parse_or<F, T, D>(lookup: &F, key: &'static str, default: D) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    D: FnOnce() -> T,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        _ => Ok(default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let cfg = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(cfg.bind_addr.port(), 3000);
        assert_eq!(cfg.max_connections, 5);
        assert_eq!(cfg.default_page_limit, 50);
    }

    #[test]
    fn test_overrides() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/registry"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("DB_MAX_CONNECTIONS", "12"),
            ("DEFAULT_PAGE_LIMIT", "20"),
        ]))
        .unwrap();
        assert_eq!(cfg.database_url, "postgres://db/registry");
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.max_connections, 12);
        assert_eq!(cfg.default_page_limit, 20);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("DB_MAX_CONNECTIONS", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DB_MAX_CONNECTIONS", .. }));

        let err = AppConfig::from_lookup(lookup_from(&[("DEFAULT_PAGE_LIMIT", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DEFAULT_PAGE_LIMIT", .. }));
    }
}
