//! Process configuration loaded from the environment.
//!
//! Variables (all prefixed `TODOAPP_`):
//!
//! - `BIND_ADDR`: listen address (default `127.0.0.1:8081`)
//! - `STORAGE`: `sqlite` (default) | `memory`
//! - `DB_PATH`: SQLite file (default `todoapp.sqlite3`)
//! - `JWT_SECRET`: token signing secret, required, at least 32 bytes
//! - `TOKEN_TTL_SECS`: session lifetime (default `7200`)
//! - `HASH_MEMORY_KIB`, `HASH_ITERATIONS`, `HASH_PARALLELISM`: Argon2id cost
//! - `LOG_LEVEL`: default `debug` in debug builds, `info` in release
//! - `LOG_DIR`: rolling log directory; unset logs to stderr

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use todoapp_core::service::credential_service::DEFAULT_TOKEN_TTL_SECS;
use todoapp_core::{default_log_level, CredentialConfig, HashCost};

pub const ENV_BIND_ADDR: &str = "TODOAPP_BIND_ADDR";
pub const ENV_STORAGE: &str = "TODOAPP_STORAGE";
pub const ENV_DB_PATH: &str = "TODOAPP_DB_PATH";
pub const ENV_JWT_SECRET: &str = "TODOAPP_JWT_SECRET";
pub const ENV_TOKEN_TTL_SECS: &str = "TODOAPP_TOKEN_TTL_SECS";
pub const ENV_HASH_MEMORY_KIB: &str = "TODOAPP_HASH_MEMORY_KIB";
pub const ENV_HASH_ITERATIONS: &str = "TODOAPP_HASH_ITERATIONS";
pub const ENV_HASH_PARALLELISM: &str = "TODOAPP_HASH_PARALLELISM";
pub const ENV_LOG_LEVEL: &str = "TODOAPP_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TODOAPP_LOG_DIR";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8081";
const DEFAULT_DB_PATH: &str = "todoapp.sqlite3";

/// Minimum signing secret length in bytes.
pub const MIN_SECRET_BYTES: usize = 32;

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageMode {
    #[default]
    Sqlite,
    Memory,
}

impl FromStr for StorageMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" | "in_memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidStorageMode(other.to_string())),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid storage mode: '{0}'. Expected 'sqlite' or 'memory'")]
    InvalidStorageMode(String),

    #[error("TODOAPP_JWT_SECRET must be at least 32 bytes, got {0}")]
    SecretTooShort(usize),
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub storage: StorageMode,
    pub db_path: PathBuf,
    pub credentials: CredentialConfig,
    pub log_level: String,
    /// Absolute log directory, `None` for stderr.
    pub log_dir: Option<String>,
}

impl ServerConfig {
    /// Loads `.env` (when present) and reads configuration from the process
    /// environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = parse_or(ENV_BIND_ADDR, read(ENV_BIND_ADDR), DEFAULT_BIND_ADDR)?;
        let storage = match read(ENV_STORAGE) {
            Some(value) => value.parse()?,
            None => StorageMode::default(),
        };
        let db_path = PathBuf::from(read(ENV_DB_PATH).unwrap_or_else(|| DEFAULT_DB_PATH.to_string()));

        let secret = read(ENV_JWT_SECRET).ok_or(ConfigError::Missing(ENV_JWT_SECRET))?;
        if secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::SecretTooShort(secret.len()));
        }

        let defaults = HashCost::default();
        let hash_cost = HashCost {
            memory_kib: parse_num(ENV_HASH_MEMORY_KIB, read(ENV_HASH_MEMORY_KIB), defaults.memory_kib)?,
            iterations: parse_num(ENV_HASH_ITERATIONS, read(ENV_HASH_ITERATIONS), defaults.iterations)?,
            parallelism: parse_num(
                ENV_HASH_PARALLELISM,
                read(ENV_HASH_PARALLELISM),
                defaults.parallelism,
            )?,
        };

        let mut credentials = CredentialConfig::new(secret.into_bytes());
        credentials.token_ttl_secs =
            parse_num(ENV_TOKEN_TTL_SECS, read(ENV_TOKEN_TTL_SECS), DEFAULT_TOKEN_TTL_SECS)?;
        credentials.hash_cost = hash_cost;

        let log_level = read(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string());
        let log_dir = read(ENV_LOG_DIR).map(|dir| absolute_dir(&dir)).transpose()?;

        Ok(Self {
            bind_addr,
            storage,
            db_path,
            credentials,
            log_level,
            log_dir,
        })
    }
}

fn parse_or<T>(name: &'static str, value: Option<String>, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = value.unwrap_or_else(|| default.to_string());
    raw.parse().map_err(|err: T::Err| ConfigError::Invalid {
        name,
        value: raw.clone(),
        reason: err.to_string(),
    })
}

fn parse_num<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|err: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: err.to_string(),
        }),
        None => Ok(default),
    }
}

fn absolute_dir(dir: &str) -> Result<String, ConfigError> {
    let path = Path::new(dir);
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|err| ConfigError::Invalid {
                name: ENV_LOG_DIR,
                value: dir.to_string(),
                reason: err.to_string(),
            })?
            .join(path)
    };

    resolved
        .to_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::Invalid {
            name: ENV_LOG_DIR,
            value: dir.to_string(),
            reason: "path is not valid UTF-8".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[rstest]
    fn defaults_apply_when_only_secret_is_set() {
        let config = ServerConfig::from_lookup(lookup(&[(ENV_JWT_SECRET, SECRET)])).unwrap();

        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.storage, StorageMode::Sqlite);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.credentials.token_ttl_secs, 7200);
        assert_eq!(config.credentials.hash_cost, HashCost::default());
        assert_eq!(config.log_level, default_log_level());
        assert!(config.log_dir.is_none());
    }

    #[rstest]
    fn missing_secret_is_rejected() {
        assert_eq!(
            ServerConfig::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::Missing(ENV_JWT_SECRET)
        );
    }

    #[rstest]
    fn short_secret_is_rejected() {
        assert_eq!(
            ServerConfig::from_lookup(lookup(&[(ENV_JWT_SECRET, "short")])).unwrap_err(),
            ConfigError::SecretTooShort(5)
        );
    }

    #[rstest]
    #[case("sqlite", StorageMode::Sqlite)]
    #[case("MEMORY", StorageMode::Memory)]
    #[case(" in_memory ", StorageMode::Memory)]
    fn storage_mode_parses(#[case] raw: &str, #[case] expected: StorageMode) {
        assert_eq!(raw.parse::<StorageMode>().unwrap(), expected);
    }

    #[rstest]
    #[case(ENV_BIND_ADDR, "not-an-addr")]
    #[case(ENV_TOKEN_TTL_SECS, "-1")]
    #[case(ENV_HASH_MEMORY_KIB, "lots")]
    fn invalid_values_name_the_variable(#[case] key: &'static str, #[case] value: &str) {
        let err = ServerConfig::from_lookup(lookup(&[(ENV_JWT_SECRET, SECRET), (key, value)]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name, .. } if name == key));
        assert!(err.to_string().contains(key));
    }

    #[rstest]
    fn relative_log_dir_is_made_absolute() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ENV_JWT_SECRET, SECRET),
            (ENV_LOG_DIR, "logs"),
            (ENV_STORAGE, "memory"),
        ]))
        .unwrap();
        let dir = config.log_dir.unwrap();
        assert!(Path::new(&dir).is_absolute());
        assert!(dir.ends_with("logs"));
    }

    #[rstest]
    fn debug_output_hides_secret() {
        let config = ServerConfig::from_lookup(lookup(&[(ENV_JWT_SECRET, SECRET)])).unwrap();
        assert!(!format!("{config:?}").contains(SECRET));
    }
}
