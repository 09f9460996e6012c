use std::path::Path;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;

use crate::error::BintError;
use crate::logging::LogLevel;

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
const DEFAULT_BODY_LIMIT: usize = 4 * 1024 * 1024;

/// Everything except RFC 3986 unreserved characters.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

fn encode(component: &str) -> impl std::fmt::Display + '_ {
    utf8_percent_encode(component, COMPONENT)
}

/// Application configuration, usually read from a YAML file:
///
/// ```yaml
/// listen: ":8080"
/// logLevel: debug
/// postgres:
///   host: 127.0.0.1
///   port: 5432
///   username: bint
///   password: secret
///   database: app
///   maxOpenConns: 20
/// redis:
///   addr: 127.0.0.1:6379
///   db: 0
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Listen address; `:port` means every interface (default `0.0.0.0:8080`).
    pub listen: String,

    /// Environment: development, production, test
    pub environment: String,

    pub log_level: LogLevel,

    /// Maximum request body accepted for body parameters, in bytes.
    pub body_limit: usize,

    /// Database section. Without it an in-memory SQLite database is used.
    pub postgres: Option<PostgresConfig>,

    /// Cache section. Without it an in-memory cache is used.
    pub redis: Option<RedisConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: String::new(),
            environment: "development".to_string(),
            log_level: LogLevel::default(),
            body_limit: DEFAULT_BODY_LIMIT,
            postgres: None,
            redis: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, BintError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| BintError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, BintError> {
        serde_yaml::from_str(content).map_err(|e| BintError::Config(e.to_string()))
    }

    /// Load configuration from environment variables (with .env support).
    pub fn from_env() -> Self {
        Config::default().apply_env()
    }

    /// Override fields from the environment:
    /// `BINT_LISTEN`, `BINT_ENV`, `BINT_LOG_LEVEL`, `DATABASE_URL`, `REDIS_URL`.
    pub fn apply_env(mut self) -> Self {
        // Load .env file if present (ignore errors if missing)
        let _ = dotenvy::dotenv();

        if let Ok(listen) = std::env::var("BINT_LISTEN") {
            self.listen = listen;
        }
        if let Ok(environment) = std::env::var("BINT_ENV") {
            self.environment = environment;
        }
        if let Ok(level) = std::env::var("BINT_LOG_LEVEL") {
            self.log_level = LogLevel::parse(&level);
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.postgres.get_or_insert_with(PostgresConfig::default).url = Some(url);
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            self.redis.get_or_insert_with(RedisConfig::default).url = Some(url);
        }
        self
    }

    /// The socket address to bind.
    pub fn listen_addr(&self) -> String {
        match self.listen.as_str() {
            "" => DEFAULT_LISTEN.to_string(),
            port if port.starts_with(':') => format!("0.0.0.0{port}"),
            addr => addr.to_string(),
        }
    }

    /// Check if running in development mode.
    pub fn is_dev(&self) -> bool {
        self.environment == "development"
    }
}

/// Database connection and pool settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    /// Opened eagerly as the pool minimum, capped at `max_open_conns` when that is set.
    pub max_idle_conns: u32,
    pub max_open_conns: u32,
    /// Seconds; values of one second or less leave the driver default.
    pub conn_max_lifetime: u64,
    /// Reported as `application_name`; defaults to the database name.
    pub conn_name: String,
    /// Log every statement.
    pub debug: bool,
    /// Full connection URL; wins over the individual fields.
    pub url: Option<String>,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        PostgresConfig {
            host: "127.0.0.1".to_string(),
            port: 5432,
            username: String::new(),
            password: String::new(),
            database: String::new(),
            max_idle_conns: 0,
            max_open_conns: 0,
            conn_max_lifetime: 0,
            conn_name: String::new(),
            debug: false,
            url: None,
        }
    }
}

impl PostgresConfig {
    /// Connection URL with credentials, database and `application_name` percent-encoded.
    pub fn url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let app_name = if self.conn_name.is_empty() {
            &self.database
        } else {
            &self.conn_name
        };
        format!(
            "postgres://{}:{}@{}:{}/{}?application_name={}",
            encode(&self.username),
            encode(&self.password),
            self.host,
            self.port,
            encode(&self.database),
            encode(app_name)
        )
    }
}

/// Cache server settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RedisConfig {
    pub addr: String,
    pub password: String,
    pub db: i64,
    /// Full connection URL; wins over the individual fields.
    pub url: Option<String>,
}

impl RedisConfig {
    pub fn url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        if self.password.is_empty() {
            format!("redis://{}/{}", self.addr, self.db)
        } else {
            format!("redis://:{}@{}/{}", encode(&self.password), self.addr, self.db)
        }
    }
}
