//! Shared configuration structures.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Configuration errors reported at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid database url: {0}")]
    Url(#[from] url::ParseError),
}

impl ConfigError {
    pub fn invalid(key: &'static str, value: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            value: value.into(),
        }
    }
}

/// Storage driver selection flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// SeaORM entity queries over a `DatabaseConnection` pool
    #[default]
    Orm,
    /// Hand-written SQL over an SQLx `PgPool`
    Raw,
}

impl FromStr for DriverKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "orm" | "sqlalchemy" => Ok(DriverKind::Orm),
            "raw" | "psycopg" => Ok(DriverKind::Raw),
            _ => Err(ConfigError::invalid("DB_DRIVER", s)),
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverKind::Orm => write!(f, "orm"),
            DriverKind::Raw => write!(f, "raw"),
        }
    }
}

/// Isolation level used for read-write units of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling, as used in `SET TRANSACTION ISOLATION LEVEL ...`
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl FromStr for IsolationLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "read_committed" => Ok(IsolationLevel::ReadCommitted),
            "repeatable_read" => Ok(IsolationLevel::RepeatableRead),
            "serializable" => Ok(IsolationLevel::Serializable),
            _ => Err(ConfigError::invalid("DB_ISOLATION_LEVEL", s)),
        }
    }
}

/// Discrete connection parameters.
#[derive(Clone)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Per-field replacements applied on top of another connection target.
#[derive(Clone, Default)]
pub struct ConnectionOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Where to connect: a full URL or discrete parameters.
#[derive(Clone)]
pub enum ConnectionConfig {
    Url(String),
    Params(ConnectionParams),
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionConfig::Url(_) => f.debug_tuple("Url").field(&"[REDACTED]").finish(),
            ConnectionConfig::Params(params) => f.debug_tuple("Params").field(params).finish(),
        }
    }
}

impl ConnectionConfig {
    /// Build the `postgres://` URL both drivers connect with.
    ///
    /// Credentials are percent-encoded.
    pub fn connection_url(&self) -> Result<String, ConfigError> {
        match self {
            ConnectionConfig::Url(url) => Ok(Url::parse(url)?.to_string()),
            ConnectionConfig::Params(p) => {
                let mut url = Url::parse(&format!("postgres://{}:{}", p.host, p.port))?;
                url.set_path(&format!("/{}", p.database));
                url.set_username(&p.user)
                    .map_err(|_| ConfigError::invalid("DB_USER", p.user.clone()))?;
                if !p.password.is_empty() {
                    url.set_password(Some(&p.password))
                        .map_err(|_| ConfigError::invalid("DB_PASSWORD", "[REDACTED]"))?;
                }
                Ok(url.to_string())
            }
        }
    }

    /// Same target with the given fields replaced.
    ///
    /// A URL target keeps its scheme and query string.
    pub fn with_overrides(
        &self,
        overrides: &ConnectionOverrides,
    ) -> Result<ConnectionConfig, ConfigError> {
        match self {
            ConnectionConfig::Params(base) => {
                let base = base.clone();
                Ok(ConnectionConfig::Params(ConnectionParams {
                    host: overrides.host.clone().unwrap_or(base.host),
                    port: overrides.port.unwrap_or(base.port),
                    database: overrides.database.clone().unwrap_or(base.database),
                    user: overrides.user.clone().unwrap_or(base.user),
                    password: overrides.password.clone().unwrap_or(base.password),
                }))
            }
            ConnectionConfig::Url(raw) => {
                let mut url = Url::parse(raw)?;
                if let Some(host) = &overrides.host {
                    url.set_host(Some(host))?;
                }
                if let Some(port) = overrides.port {
                    url.set_port(Some(port))
                        .map_err(|_| ConfigError::invalid("DB_READONLY_PORT", port.to_string()))?;
                }
                if let Some(database) = &overrides.database {
                    url.set_path(&format!("/{}", database));
                }
                if let Some(user) = &overrides.user {
                    url.set_username(user)
                        .map_err(|_| ConfigError::invalid("DB_READONLY_USER", user.clone()))?;
                }
                if let Some(password) = &overrides.password {
                    url.set_password(Some(password))
                        .map_err(|_| ConfigError::invalid("DB_READONLY_PASSWORD", "[REDACTED]"))?;
                }
                Ok(ConnectionConfig::Url(url.to_string()))
            }
        }
    }

    /// Host name for log lines (never includes credentials).
    pub fn host(&self) -> String {
        match self {
            ConnectionConfig::Url(url) => Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_else(|| "unknown".to_string()),
            ConnectionConfig::Params(p) => p.host.clone(),
        }
    }
}

/// Connection pool sizing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Connections kept open while idle
    pub pool_size: u32,
    /// Extra connections allowed above `pool_size` under load
    pub max_overflow: u32,
    /// Seconds to wait for a free connection before failing
    pub acquire_timeout_secs: u64,
}

impl PoolConfig {
    /// Hard upper bound on open connections
    pub fn max_connections(&self) -> u32 {
        self.pool_size.saturating_add(self.max_overflow).max(1)
    }

    /// Connections kept warm
    pub fn min_connections(&self) -> u32 {
        self.pool_size.min(self.max_connections())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 5,
            max_overflow: 10,
            acquire_timeout_secs: 5,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Writer (primary) connection
    pub primary: ConnectionConfig,
    /// Optional read replica for read-only handles
    pub readonly: Option<ConnectionConfig>,
    pub pool: PoolConfig,
    pub isolation: IsolationLevel,
    /// Log every SQL statement
    pub sql_echo: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            primary: ConnectionConfig::Params(ConnectionParams {
                host: "localhost".to_string(),
                port: 5432,
                database: "users".to_string(),
                user: "postgres".to_string(),
                password: String::new(),
            }),
            readonly: None,
            pool: PoolConfig::default(),
            isolation: IsolationLevel::default(),
            sql_echo: false,
        }
    }
}
