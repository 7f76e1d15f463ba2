//! Gateway configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: env vars > .env file > config.toml > defaults
//!
//! The loaded [`AppConfig`] is returned by value. The server builds its
//! immutable state from it once at startup and hands that state to the router.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};
use serde::Deserialize;
use std::path::Path;

/// Load configuration, looking for an optional `config.{toml,yaml,json}` in
/// the working directory.
pub fn load() -> Result<AppConfig, ConfigError> {
    load_with(None)
}

/// Load configuration, reading `config_file` (which must exist) instead of the
/// default `config` lookup when one is given.
pub fn load_with(config_file: Option<&Path>) -> Result<AppConfig, ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let builder = match config_file {
        Some(path) => defaults()?.add_source(config::File::from(path).required(true)),
        None => defaults()?.add_source(config::File::with_name("config").required(false)),
    };

    builder
        // Environment variables (SHELF__STORAGE__ROOT, SHELF__SERVER__PORT, etc.)
        .add_source(
            config::Environment::with_prefix("SHELF")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

/// Builder pre-populated with every default value.
pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("server.health_path", "/_shelf/health")?
        .set_default("storage.root", "/data")?
        // S3Proxy's filesystem backend stores user metadata as `user.` keys
        // inside the `user` xattr namespace.
        .set_default("storage.xattr_prefix", "user.user.")?
        .set_default("log.format", "pretty")
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Unix domain socket to listen on. When set, `host`/`port` are ignored.
    pub socket_path: Option<String>,
    /// Tokio worker threads. Defaults to the number of CPUs.
    pub workers: Option<usize>,
    /// Route answering health checks. Empty disables it.
    pub health_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory every served file must live under.
    pub root: String,
    /// Prefix prepended to `content-type`, `cache-control` and
    /// `content-disposition` to form the extended attribute names.
    pub xattr_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}
