// Application configuration
// Read from the environment (optionally seeded from a .env file)

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::cache::DEFAULT_CAPACITY;

/// Default maximum number of writes per store batch
pub const DEFAULT_BATCH_SIZE: usize = 500;

const DEV_JWT_SECRET: &str = "dev-secret-key";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Tuning knobs for the assignment service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentSettings {
    /// Maximum updates per store write batch (at least 1)
    pub batch_size: usize,
    /// Lifetime of cached file listing pages
    pub listing_ttl: Duration,
    /// Lifetime of cached assignment statistics
    pub stats_ttl: Duration,
    /// Bound on each individual store call; a write batch that overruns
    /// it counts as failed
    pub store_timeout: Duration,
}

impl Default for AssignmentSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            listing_ttl: Duration::from_secs(60),
            stats_ttl: Duration::from_secs(30),
            store_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string; `None` runs against the in-memory store
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub listen_addr: SocketAddr,
    pub jwt_secret: String,
    pub cache_capacity: usize,
    pub request_timeout: Duration,
    pub assignment: AssignmentSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: 5,
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            cache_capacity: DEFAULT_CAPACITY,
            request_timeout: Duration::from_secs(30),
            assignment: AssignmentSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set, using development secret");
            DEV_JWT_SECRET.to_string()
        });

        let batch_size = parse_or(&lookup, "ASSIGN_BATCH_SIZE", defaults.assignment.batch_size)?;
        if batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ASSIGN_BATCH_SIZE",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            listen_addr: parse_or(&lookup, "LISTEN_ADDR", defaults.listen_addr)?,
            jwt_secret,
            cache_capacity: parse_or(&lookup, "CACHE_CAPACITY", defaults.cache_capacity)?,
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            assignment: AssignmentSettings {
                batch_size,
                listing_ttl: Duration::from_secs(parse_or(
                    &lookup,
                    "CACHE_TTL_SECS",
                    defaults.assignment.listing_ttl.as_secs(),
                )?),
                stats_ttl: Duration::from_secs(parse_or(
                    &lookup,
                    "STATS_CACHE_TTL_SECS",
                    defaults.assignment.stats_ttl.as_secs(),
                )?),
                store_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "STORE_TIMEOUT_SECS",
                    defaults.assignment.store_timeout.as_secs(),
                )?),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}
