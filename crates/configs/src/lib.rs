//! Application configuration.
//!
//! Settings come from an optional TOML file (`CONFIG_PATH`, default `config.toml`)
//! overlaid with environment variables. The result is validated once at startup and
//! handed to constructors by reference.

use std::{path::Path, str::FromStr};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("missing required settings: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid { key, reason: reason.into() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

/// Which storage backend the server is wired with.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Postgres,
    Mongo,
    Memory,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mongo" | "mongodb" => Ok(Self::Mongo),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::invalid(
                "STORAGE_BACKEND",
                format!("unknown backend `{other}` (expected postgres, mongo or memory)"),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub mongo: MongoConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: None,
            user: String::new(),
            password: String::new(),
            name: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    #[serde(default)]
    pub uri: String,
    #[serde(default = "default_mongo_database")]
    pub database: String,
    #[serde(default = "default_op_timeout")]
    pub op_timeout_secs: u64,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self { uri: String::new(), database: default_mongo_database(), op_timeout_secs: default_op_timeout() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    #[serde(default = "default_avatar_subdir")]
    pub avatar_subdir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self { static_dir: default_static_dir(), avatar_subdir: default_avatar_subdir() }
    }
}

impl PathsConfig {
    /// Directory avatar thumbnails are written to.
    pub fn avatar_dir(&self) -> std::path::PathBuf {
        Path::new(&self.static_dir).join(&self.avatar_subdir)
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 30 }
fn default_acquire_timeout() -> u64 { 30 }
fn default_mongo_database() -> String { "GoNews".into() }
fn default_op_timeout() -> u64 { 5 }
fn default_static_dir() -> String { "static".into() }
fn default_avatar_subdir() -> String { "avatars".into() }

/// Load `CONFIG_PATH` (or `config.toml`) if present, overlay the process environment
/// and validate.
pub fn load_default() -> Result<AppConfig, ConfigError> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let mut cfg = if Path::new(&path).exists() { load_from_file(&path)? } else { AppConfig::default() };
    cfg.apply_env(|key| std::env::var(key).ok())?;
    cfg.normalize_and_validate()?;
    Ok(cfg)
}

pub fn load_from_file(path: &str) -> Result<AppConfig, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_string(), source })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse { path: path.to_string(), source })
}

impl AppConfig {
    /// Overlay settings from environment-style lookups. Unset or blank keys leave the
    /// current value untouched.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("SERVER_PORT") {
            self.server.port = parse_num("SERVER_PORT", &port)?;
        }
        if let Some(threads) = get("TOKIO_WORKER_THREADS") {
            self.server.worker_threads = Some(parse_num("TOKIO_WORKER_THREADS", &threads)?);
        }
        if let Some(backend) = get("STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }

        let pg = &mut self.storage.postgres;
        if let Some(v) = get("DB_HOST") { pg.host = v; }
        if let Some(v) = get("DB_PORT") { pg.port = Some(parse_num("DB_PORT", &v)?); }
        if let Some(v) = get("DB_USER") { pg.user = v; }
        if let Some(v) = get("DB_PASSWORD") { pg.password = v; }
        if let Some(v) = get("DB_NAME") { pg.name = v; }

        let mongo = &mut self.storage.mongo;
        if let Some(v) = get("MONGO_URI") { mongo.uri = v; }
        if let Some(v) = get("MONGO_DATABASE") { mongo.database = v; }

        if let Some(v) = get("STATIC_DIR") {
            self.paths.static_dir = v;
        }
        Ok(())
    }

    pub fn normalize_and_validate(&mut self) -> Result<(), ConfigError> {
        self.server.normalize()?;
        match self.storage.backend {
            Backend::Postgres => self.storage.postgres.validate()?,
            Backend::Mongo => self.storage.mongo.validate()?,
            Backend::Memory => {}
        }
        if self.paths.static_dir.trim().is_empty() {
            return Err(ConfigError::invalid("STATIC_DIR", "must not be empty"));
        }
        Ok(())
    }
}

fn parse_num<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::invalid(key, e.to_string()))
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(ConfigError::invalid("SERVER_PORT", "must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl PostgresConfig {
    /// Every connection parameter must be present; the error lists all that are not.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.host.trim().is_empty() { missing.push("DB_HOST"); }
        if self.port.is_none() { missing.push("DB_PORT"); }
        if self.user.trim().is_empty() { missing.push("DB_USER"); }
        if self.password.is_empty() { missing.push("DB_PASSWORD"); }
        if self.name.trim().is_empty() { missing.push("DB_NAME"); }
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }
        if self.port == Some(0) {
            return Err(ConfigError::invalid("DB_PORT", "must be in 1..=65535"));
        }
        if self.min_connections == 0 {
            return Err(ConfigError::invalid("database.min_connections", "must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(ConfigError::invalid("database.max_connections", "must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(ConfigError::invalid("database timeouts", "must be positive seconds"));
        }
        Ok(())
    }

    /// Connection URL with user and password percent-encoded.
    pub fn url(&self) -> Result<String, ConfigError> {
        self.validate()?;
        let mut url = Url::parse("postgres://localhost")
            .map_err(|e| ConfigError::invalid("DB_HOST", e.to_string()))?;
        url.set_host(Some(self.host.trim()))
            .map_err(|e| ConfigError::invalid("DB_HOST", e.to_string()))?;
        url.set_port(self.port)
            .map_err(|()| ConfigError::invalid("DB_PORT", "cannot be applied to host"))?;
        url.set_username(self.user.trim())
            .map_err(|()| ConfigError::invalid("DB_USER", "cannot be applied to host"))?;
        url.set_password(Some(&self.password))
            .map_err(|()| ConfigError::invalid("DB_PASSWORD", "cannot be applied to host"))?;
        url.set_path(self.name.trim());
        Ok(url.into())
    }
}

impl MongoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.uri.trim().is_empty() {
            return Err(ConfigError::Missing(vec!["MONGO_URI"]));
        }
        if !(self.uri.starts_with("mongodb://") || self.uri.starts_with("mongodb+srv://")) {
            return Err(ConfigError::invalid("MONGO_URI", "must start with mongodb:// or mongodb+srv://"));
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::invalid("MONGO_DATABASE", "must not be empty"));
        }
        if self.op_timeout_secs == 0 {
            return Err(ConfigError::invalid("mongo.op_timeout_secs", "must be positive seconds"));
        }
        Ok(())
    }
}
