use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::db::DEFAULT_POOL_SIZE;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRpcConfig {
    pub primary_url: String,
    pub backup_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub max_attempts: i32,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 20,
            max_attempts: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub db_pool_size: u32,
    pub host: String,
    pub port: u16,
    pub legacy_rpc: LegacyRpcConfig,
    pub mirror: MirrorConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let defaults = MirrorConfig::default();

        Ok(Self {
            database_url,
            db_pool_size: parse_or(&lookup, "DB_POOL_SIZE", DEFAULT_POOL_SIZE)?,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            legacy_rpc: LegacyRpcConfig {
                primary_url: lookup("LEGACY_RPC_PRIMARY_URL").unwrap_or_default(),
                backup_url: lookup("LEGACY_RPC_BACKUP_URL").unwrap_or_default(),
                timeout: Duration::from_secs(parse_or(&lookup, "LEGACY_RPC_TIMEOUT_SECS", 12)?),
            },
            mirror: MirrorConfig {
                poll_interval: Duration::from_secs(parse_or(
                    &lookup,
                    "MIRROR_POLL_INTERVAL_SECS",
                    defaults.poll_interval.as_secs(),
                )?),
                batch_size: parse_or(&lookup, "MIRROR_BATCH_SIZE", defaults.batch_size)?,
                max_attempts: parse_or(&lookup, "MIRROR_MAX_ATTEMPTS", defaults.max_attempts)?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
