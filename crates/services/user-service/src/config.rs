//! User service configuration.

use std::env;
use std::str::FromStr;

use common::{
    ConfigError, ConnectionConfig, ConnectionOverrides, ConnectionParams, DatabaseConfig,
    DriverKind, IsolationLevel, PoolConfig, MAX_PAGE_SIZE,
};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::invalid("LOG_FORMAT", s)),
        }
    }
}

/// User service configuration.
#[derive(Debug, Clone)]
pub struct UserServiceConfig {
    /// Storage driver serving requests
    pub driver: DriverKind,
    pub database: DatabaseConfig,
    /// Upper bound applied to `list_users` limits
    pub max_page_size: u64,
    pub log_format: LogFormat,
}

impl UserServiceConfig {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // REPOSITORY_TYPE (sqlalchemy|psycopg) is the older spelling of DB_DRIVER
        let driver = match (get("DB_DRIVER"), get("REPOSITORY_TYPE")) {
            (Some(v), _) => v.parse()?,
            (None, Some(v)) => v
                .parse()
                .map_err(|_| ConfigError::invalid("REPOSITORY_TYPE", v))?,
            (None, None) => DriverKind::default(),
        };

        let primary = match get("DATABASE_URL") {
            Some(url) => {
                let primary = ConnectionConfig::Url(url);
                primary.connection_url()?;
                primary
            }
            None => {
                let password = get("DB_PASSWORD").ok_or(ConfigError::Missing("DB_PASSWORD"))?;
                ConnectionConfig::Params(ConnectionParams {
                    host: get("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
                    port: parse_or("DB_PORT", get("DB_PORT"), 5432)?,
                    database: get("DB_NAME").unwrap_or_else(|| "postgres".to_string()),
                    user: get("DB_USER").unwrap_or_else(|| "postgres".to_string()),
                    password,
                })
            }
        };

        let readonly = if parse_or("DB_READONLY_ENABLED", get("DB_READONLY_ENABLED"), false)? {
            Some(readonly_connection(&get, &primary)?)
        } else {
            None
        };

        let pool = PoolConfig {
            pool_size: parse_or("DB_POOL_SIZE", get("DB_POOL_SIZE"), 5)?,
            max_overflow: parse_or("DB_MAX_OVERFLOW", get("DB_MAX_OVERFLOW"), 10)?,
            acquire_timeout_secs: parse_or(
                "DB_ACQUIRE_TIMEOUT_SECS",
                get("DB_ACQUIRE_TIMEOUT_SECS"),
                5,
            )?,
        };

        let isolation = match get("DB_ISOLATION_LEVEL") {
            Some(v) => v.parse()?,
            None => IsolationLevel::default(),
        };

        let log_format = match get("LOG_FORMAT") {
            Some(v) => v.parse()?,
            None => LogFormat::default(),
        };

        let max_page_size: u64 =
            parse_or("USER_MAX_PAGE_SIZE", get("USER_MAX_PAGE_SIZE"), MAX_PAGE_SIZE)?;
        if max_page_size == 0 {
            return Err(ConfigError::invalid("USER_MAX_PAGE_SIZE", "0"));
        }

        Ok(Self {
            driver,
            database: DatabaseConfig {
                primary,
                readonly,
                pool,
                isolation,
                sql_echo: parse_or("SQL_ECHO", get("SQL_ECHO"), false)?,
            },
            max_page_size,
            log_format,
        })
    }
}

/// Replica settings: `DB_READONLY_URL`, or `DB_READONLY_*` parameters each
/// falling back to the primary's value.
fn readonly_connection<G>(
    get: &G,
    primary: &ConnectionConfig,
) -> Result<ConnectionConfig, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    if let Some(url) = get("DB_READONLY_URL") {
        let replica = ConnectionConfig::Url(url);
        replica.connection_url()?;
        return Ok(replica);
    }

    let port = get("DB_READONLY_PORT")
        .map(|v| {
            v.trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::invalid("DB_READONLY_PORT", v))
        })
        .transpose()?;
    let overrides = ConnectionOverrides {
        host: get("DB_READONLY_HOST"),
        port,
        database: get("DB_READONLY_NAME"),
        user: get("DB_READONLY_USER"),
        password: get("DB_READONLY_PASSWORD"),
    };

    primary.with_overrides(&overrides)
}

fn parse_or<T: FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v
            .trim()
            .to_ascii_lowercase()
            .parse()
            .map_err(|_| ConfigError::invalid(key, v)),
        None => Ok(default),
    }
}
