use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use log::{info, warn};
use thiserror::Error;

use crate::constants::{
    DEFAULT_BIND_ADDRESS, DEFAULT_DATABASE_URL, DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_UPLOAD_BYTES,
    DEFAULT_MEDIA_ROOT, DEFAULT_TOKEN_TTL_HOURS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),

    #[error("invalid {key} value: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub media_root: PathBuf,
    pub max_upload_bytes: u64,
}

impl Config {
    /// Reads `.env` when present, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from {}", path.display());
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Ok(Self {
            bind_address: try_load(&lookup, "RECEPIE_BIND", DEFAULT_BIND_ADDRESS)?,
            database_url: try_load(&lookup, "DATABASE_URL", DEFAULT_DATABASE_URL)?,
            max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            jwt_secret,
            token_ttl_hours: try_load(&lookup, "TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS)?,
            media_root: try_load(&lookup, "MEDIA_ROOT", DEFAULT_MEDIA_ROOT)?,
            max_upload_bytes: try_load(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }

    /// In-memory database and a fixed secret; media goes to `media_root`.
    pub fn for_tests(media_root: impl Into<PathBuf>) -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: "sqlite::memory:".to_owned(),
            max_connections: 1,
            jwt_secret: "test-secret".to_owned(),
            token_ttl_hours: 1,
            media_root: media_root.into(),
            max_upload_bytes: 1024 * 1024,
        }
    }
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                message: e.to_string(),
            }
        })
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
    fn defaults_fill_everything_but_the_secret() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();

        assert_eq!(config.bind_address.port(), 8000);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.token_ttl_hours, 24);
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.media_root, PathBuf::from("./media"));
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn unparsable_values_name_the_variable() {
        let err = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("TOKEN_TTL_HOURS", "soon"),
        ]))
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { key: "TOKEN_TTL_HOURS", .. }));
    }
}
