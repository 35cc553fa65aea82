use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_DATA_DIR: &str = "/app/data";
const DEFAULT_MAX_APPLY_DAYS: i64 = 400;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File,
}

/// Runtime settings read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub store_backend: StoreBackend,
    pub data_dir: PathBuf,
    pub admin_auth_token: Option<String>,
    pub max_apply_days: i64,
    pub is_production: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse::<SocketAddr>().map_err(|_| ConfigError::InvalidValue {
            name: "BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let store_backend = match lookup("SLOT_STORE_BACKEND")
            .map(|v| v.to_lowercase())
            .as_deref()
        {
            None | Some("memory") => StoreBackend::Memory,
            Some("file") => StoreBackend::File,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "SLOT_STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let data_dir = PathBuf::from(
            lookup("SLOT_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        );

        let admin_auth_token = lookup("ADMIN_AUTH_TOKEN").filter(|t| !t.is_empty());

        let max_apply_days = match lookup("MAX_APPLY_DAYS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|days| *days > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: "MAX_APPLY_DAYS",
                    value: raw,
                })?,
            None => DEFAULT_MAX_APPLY_DAYS,
        };

        let is_production = lookup("ENVIRONMENT")
            .map(|val| val.to_lowercase() == "production")
            .unwrap_or(false);

        Ok(Self {
            bind_addr,
            store_backend,
            data_dir,
            admin_auth_token,
            max_apply_days,
            is_production,
        })
    }

    /// Admin routes are mounted outside production, or in production when
    /// they are protected by a token.
    pub fn admin_routes_enabled(&self) -> bool {
        !self.is_production || self.admin_auth_token.is_some()
    }

    pub fn log_summary(&self) {
        info!("Store backend: {:?}", self.store_backend);
        if self.admin_auth_token.is_some() {
            info!("Admin authentication enabled with provided token");
        } else {
            info!("No admin authentication token provided - authentication disabled");
        }
        if self.is_production {
            info!("Running in PRODUCTION mode");
        } else {
            info!("Running in DEVELOPMENT mode - all endpoints will be available");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.max_apply_days, 400);
        assert!(config.admin_auth_token.is_none());
        assert!(config.admin_routes_enabled());
    }

    #[test]
    fn test_file_backend_and_token() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SLOT_STORE_BACKEND", "FILE"),
            ("SLOT_DATA_DIR", "/tmp/slots"),
            ("ADMIN_AUTH_TOKEN", "secret"),
            ("ENVIRONMENT", "production"),
        ]))
        .unwrap();

        assert_eq!(config.store_backend, StoreBackend::File);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/slots"));
        assert_eq!(config.admin_auth_token.as_deref(), Some("secret"));
        assert!(config.is_production);
        assert!(config.admin_routes_enabled());
    }

    #[test]
    fn test_production_without_token_hides_admin() {
        let config = AppConfig::from_lookup(lookup_from(&[("ENVIRONMENT", "production")])).unwrap();
        assert!(!config.admin_routes_enabled());
    }

    #[test]
    fn test_invalid_values() {
        let err = AppConfig::from_lookup(lookup_from(&[("SLOT_STORE_BACKEND", "redis")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                name: "SLOT_STORE_BACKEND",
                value: "redis".to_string()
            }
        );

        assert!(AppConfig::from_lookup(lookup_from(&[("MAX_APPLY_DAYS", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("BIND_ADDR", "nowhere")])).is_err());
    }
}
