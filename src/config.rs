//! Process configuration read from the environment (after `.env`).
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub provider_keys: ProviderKeys,
    /// How long a stored provider snapshot is served before a live fetch.
    pub snapshot_ttl: Duration,
    pub worker_interval: Duration,
}

/// Third-party credentials. These never leave the server.
#[derive(Debug, Clone, Default)]
pub struct ProviderKeys {
    pub news_api_key: Option<String>,
    pub jobs_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bind_addr = match non_empty("BIND_ADDR") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "BIND_ADDR",
                value,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        Ok(Self {
            database_url: non_empty("DATABASE_URL")
                .unwrap_or_else(|| "postgres://telegazeta:telegazeta@db:5432/telegazeta".into()),
            jwt_secret: non_empty("JWT_SECRET").unwrap_or_else(|| "change-me".into()),
            bind_addr,
            admin_username: non_empty("ADMIN_USERNAME"),
            admin_password: non_empty("ADMIN_PASSWORD"),
            provider_keys: ProviderKeys {
                news_api_key: non_empty("NEWS_API_KEY"),
                jobs_api_key: non_empty("JOBS_API_KEY"),
            },
            snapshot_ttl: seconds(&non_empty, "SNAPSHOT_TTL_SECS", 120)?,
            worker_interval: positive(
                "WORKER_INTERVAL_SECS",
                seconds(&non_empty, "WORKER_INTERVAL_SECS", 120)?,
            )?,
        })
    }
}

fn seconds<F>(lookup: &F, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(Duration::from_secs(default)),
    }
}

/// `tokio::time::interval` panics on a zero period.
fn positive(key: &'static str, duration: Duration) -> Result<Duration, ConfigError> {
    if duration.is_zero() {
        return Err(ConfigError::Invalid {
            key,
            value: "0".into(),
        });
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.jwt_secret, "change-me");
        assert_eq!(config.snapshot_ttl, Duration::from_secs(120));
        assert!(config.admin_username.is_none());
        assert!(config.provider_keys.news_api_key.is_none());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config(&[("NEWS_API_KEY", "  "), ("JWT_SECRET", "")]).unwrap();
        assert!(config.provider_keys.news_api_key.is_none());
        assert_eq!(config.jwt_secret, "change-me");
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = config(&[("SNAPSHOT_TTL_SECS", "soon")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for SNAPSHOT_TTL_SECS: soon");
        assert!(config(&[("BIND_ADDR", "nowhere")]).is_err());
    }

    #[test]
    fn zero_worker_interval_is_rejected() {
        let err = config(&[("WORKER_INTERVAL_SECS", "0")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for WORKER_INTERVAL_SECS: 0");
        let config = config(&[("WORKER_INTERVAL_SECS", "30"), ("SNAPSHOT_TTL_SECS", "0")]).unwrap();
        assert_eq!(config.worker_interval, Duration::from_secs(30));
        assert!(config.snapshot_ttl.is_zero());
    }
}
