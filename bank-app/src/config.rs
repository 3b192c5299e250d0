//! Configuration loading from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Interval between rate feed messages
    pub rate_feed_tick: Duration,
    /// Interval between synthetic rate windows
    pub rate_generator_interval: Duration,
    pub rate_limit_per_minute: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = parse_or(&lookup, "PORT", 3000)?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let tick_ms: u64 = parse_or(&lookup, "RATE_FEED_TICK_MS", 3000)?;
        let generator_secs: u64 = parse_or(&lookup, "RATE_GENERATOR_INTERVAL_SECS", 5)?;
        if tick_ms == 0 || generator_secs == 0 {
            anyhow::bail!("RATE_FEED_TICK_MS and RATE_GENERATOR_INTERVAL_SECS must be positive");
        }

        Ok(Self {
            port,
            database_url,
            rate_feed_tick: Duration::from_millis(tick_ms),
            rate_generator_interval: Duration::from_secs(generator_secs),
            rate_limit_per_minute: parse_or(&lookup, "RATE_LIMIT_PER_MINUTE", 100)?,
        })
    }

    /// Database URL without credentials, for logging.
    pub fn database_scheme(&self) -> &str {
        self.database_url
            .split_once(':')
            .map_or("unknown", |(scheme, _)| scheme)
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {}: {:?}", name, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "sqlite::memory:")]).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.rate_feed_tick, Duration::from_secs(3));
        assert_eq!(config.rate_generator_interval, Duration::from_secs(5));
        assert_eq!(config.rate_limit_per_minute, 100);
        assert_eq!(config.database_scheme(), "sqlite");
    }

    #[test]
    fn test_database_url_required() {
        assert!(load(&[]).is_err());
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let config = load(&[
            ("DATABASE_URL", "postgres://u:secret@db/bank"),
            ("PORT", "8080"),
            ("RATE_FEED_TICK_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rate_feed_tick, Duration::from_millis(250));
        assert_eq!(config.database_scheme(), "postgres");

        let err = load(&[("DATABASE_URL", "x:"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        assert!(load(&[("DATABASE_URL", "x:"), ("RATE_FEED_TICK_MS", "0")]).is_err());
    }
}
