//! Process settings read from the environment (`.env` honoured).

use crate::error::ConfigError;
use std::str::FromStr;

const DEFAULT_MAX_LIMIT: u64 = 1000;
const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub environment: Environment,
    /// Absent means no relational backend is configured.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub bind_addr: String,
    pub schema_path: String,
    /// Mount point for the data routes; the endpoint is `<api_path>/db`.
    pub api_path: String,
    /// `None` when `MAX_LIMIT=0`.
    pub max_limit: Option<u64>,
    pub body_limit_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            environment: Environment::Development,
            database_url: None,
            db_max_connections: 5,
            bind_addr: "0.0.0.0:3000".into(),
            schema_path: "schema.json".into(),
            api_path: "/api".into(),
            max_limit: Some(DEFAULT_MAX_LIMIT),
            body_limit_bytes: DEFAULT_BODY_LIMIT,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        // a missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and blank keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Settings::default();

        let environment = match get("APP_ENV").map(|v| v.to_lowercase()).as_deref() {
            None | Some("development") | Some("dev") => Environment::Development,
            Some("production") | Some("prod") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::Settings(format!(
                    "APP_ENV must be production or development, got '{}'",
                    other
                )))
            }
        };
        let max_limit = match parse(&get, "MAX_LIMIT")? {
            Some(0) => None,
            Some(n) => Some(n),
            None => defaults.max_limit,
        };

        Ok(Settings {
            environment,
            database_url: get("DATABASE_URL"),
            db_max_connections: parse(&get, "DB_MAX_CONNECTIONS")?.unwrap_or(defaults.db_max_connections),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            schema_path: get("SCHEMA_PATH").unwrap_or(defaults.schema_path),
            api_path: get("API_PATH").unwrap_or(defaults.api_path),
            max_limit,
            body_limit_bytes: parse(&get, "BODY_LIMIT_BYTES")?.unwrap_or(defaults.body_limit_bytes),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn parse<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError> {
    get(key)
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| ConfigError::Settings(format!("{} must be a non-negative integer, got '{}'", key, v)))
        })
        .transpose()
}
