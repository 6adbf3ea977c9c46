//! Connection configuration
//!
//! [`Config`] can be built in code with the `with_*` setters or loaded from a
//! TOML file with environment overrides:
//!
//! ```toml
//! host = "db.internal"
//! port = 5432
//! name = "users"
//! user = "service"
//! password = "secret"
//! pool_size = 8
//! connection_timeout_ms = 2000
//! query_timeout_ms = 5000
//! ```
//!
//! Environment variable overrides use the `DB_` prefix:
//! ```bash
//! DB_HOST=localhost
//! DB_QUERY_TIMEOUT_MS=500
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Default PostgreSQL port
pub const DEFAULT_PORT: u16 = 5432;

/// Smallest pool accepted by [`Config::valid`]
pub const MIN_POOL_SIZE: usize = 2;

/// Database connection settings
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Database name
    pub name: String,
    pub user: String,
    pub password: String,
    /// Maximum number of pooled connections
    pub pool_size: usize,
    /// Bound on pool creation, 0 disables it
    pub connection_timeout_ms: u64,
    /// Bound on each query / execute, 0 disables it
    pub query_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            name: String::new(),
            user: String::new(),
            password: String::new(),
            pool_size: 10,
            connection_timeout_ms: 5_000,
            query_timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// Load from a TOML file, then apply `DB_*` environment overrides
    ///
    /// A missing file is not an error; every field keeps its default.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("DB_"))
            .extract()
    }

    /// Load from `DB_*` environment variables only
    pub fn from_env() -> Result<Self, figment::Error> {
        Figment::new().merge(Env::prefixed("DB_")).extract()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// All credentials present and a pool of at least [`MIN_POOL_SIZE`]
    pub fn valid(&self) -> bool {
        !self.host.is_empty()
            && !self.name.is_empty()
            && !self.user.is_empty()
            && !self.password.is_empty()
            && self.pool_size >= MIN_POOL_SIZE
    }

    /// Backend-neutral pool parameters derived from this configuration
    pub fn to_pool_params(&self) -> PoolParams {
        PoolParams {
            host: self.host.clone(),
            port: self.port,
            dbname: self.name.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            max_size: self.pool_size,
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}@{}:{}", self.name, self.user, self.host, self.port)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"***")
            .field("pool_size", &self.pool_size)
            .field("connection_timeout_ms", &self.connection_timeout_ms)
            .field("query_timeout_ms", &self.query_timeout_ms)
            .finish()
    }
}

/// What a [`crate::core::PoolFactory`] needs to open a pool
#[derive(Clone, PartialEq, Eq)]
pub struct PoolParams {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub max_size: usize,
}

impl PoolParams {
    /// libpq-style key/value connection string
    ///
    /// Values that are empty or contain spaces, quotes or backslashes are
    /// single-quoted with backslash escapes.
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            conninfo_value(&self.host),
            self.port,
            conninfo_value(&self.dbname),
            conninfo_value(&self.user),
            conninfo_value(&self.password)
        )
    }
}

fn conninfo_value(value: &str) -> String {
    if !value.is_empty() && !value.contains(|c: char| c.is_whitespace() || c == '\'' || c == '\\') {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

impl fmt::Debug for PoolParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}
