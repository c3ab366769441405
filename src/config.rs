use std::env;
use std::net::SocketAddr;

use crate::error::AppError;
use crate::store::RtdbConfig;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DATABASE_URL: &str = "sqlite://goalboard.db";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Local cache database.
    pub database_url: String,
    /// Hosted store; the in-memory store is used when absent.
    pub store: Option<RtdbConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let raw_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .parse()
            .map_err(|_| AppError::Config(format!("BIND_ADDR is not a socket address: {}", raw_addr)))?;

        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        Ok(Self {
            bind_addr,
            database_url,
            store: RtdbConfig::from_lookup(&lookup),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.database_url, "sqlite://goalboard.db");
        assert!(config.store.is_none());
    }

    #[test]
    fn store_settings_are_read() {
        let config = AppConfig::from_lookup(lookup(&[
            ("STORE_URL", "https://example.test"),
            ("STORE_AUTH_TOKEN", "secret"),
            ("BIND_ADDR", "0.0.0.0:8080"),
        ]))
        .unwrap();
        let store = config.store.unwrap();
        assert_eq!(store.base_url, "https://example.test");
        assert_eq!(store.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn bad_bind_addr_is_a_config_error() {
        let err = AppConfig::from_lookup(lookup(&[("BIND_ADDR", "nowhere")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
