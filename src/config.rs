use std::{fmt::Display, str::FromStr, time::Duration};

use anyhow::anyhow;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    /// Deadline for one core operation, also used as pool acquire and busy timeout.
    pub storage_timeout: Duration,
    /// How often a subscribed chat is re-fetched and pushed as a snapshot.
    pub refresh_interval: Duration,
    pub notifier_capacity: usize,
    pub session_inactivity: time::Duration,
    pub cors_origin: Option<String>,
    pub max_message_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://skillswap.db?mode=rwc".to_owned(),
            bind_addr: "0.0.0.0:8080".to_owned(),
            max_connections: 16,
            storage_timeout: Duration::from_millis(5000),
            refresh_interval: Duration::from_millis(3000),
            notifier_capacity: 64,
            session_inactivity: time::Duration::days(7),
            cors_origin: None,
            max_message_len: 4000,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();

        let config = Config {
            database_url: dotenv::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: dotenv::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_connections: var_or("DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            storage_timeout: Duration::from_millis(var_or(
                "STORAGE_TIMEOUT_MS",
                defaults.storage_timeout.as_millis() as u64,
            )?),
            refresh_interval: Duration::from_millis(var_or(
                "REFRESH_INTERVAL_MS",
                defaults.refresh_interval.as_millis() as u64,
            )?),
            notifier_capacity: var_or("NOTIFIER_CAPACITY", defaults.notifier_capacity)?,
            session_inactivity: time::Duration::minutes(var_or(
                "SESSION_INACTIVITY_MINUTES",
                defaults.session_inactivity.whole_minutes(),
            )?),
            cors_origin: dotenv::var("CORS_ORIGIN").ok(),
            max_message_len: var_or("MAX_MESSAGE_LEN", defaults.max_message_len)?,
        };

        if config.notifier_capacity == 0 {
            return Err(anyhow!("NOTIFIER_CAPACITY must be at least 1"));
        }
        if config.refresh_interval.is_zero() {
            return Err(anyhow!("REFRESH_INTERVAL_MS must be positive"));
        }

        Ok(config)
    }
}

fn var_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match dotenv::var(key) {
        Ok(raw) => parse_var(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_var<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|err| anyhow!("invalid value for {key}: {raw:?} ({err})"))
}
