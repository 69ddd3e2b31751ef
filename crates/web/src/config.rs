use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use storage::services::SchedulerConfig;
use strava::DEFAULT_BASE_URL;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub api_keys: String,
    /// Application token used for segment lookups
    pub strava_access_token: Option<String>,
    pub strava_base_url: String,
    /// Timezone in which challenge windows are pinned to whole days
    pub reference_offset: FixedOffset,
    pub scheduler: SchedulerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = SchedulerConfig::default();

        let offset_minutes: i32 = parse_or(&lookup, "REFERENCE_UTC_OFFSET_MINUTES", 0)?;
        let reference_offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| anyhow!("REFERENCE_UTC_OFFSET_MINUTES is out of range"))?;

        let scheduler = SchedulerConfig {
            interval: Duration::from_secs(parse_or(
                &lookup,
                "SWEEP_INTERVAL_SECS",
                defaults.interval.as_secs(),
            )?),
            sweep_timeout: Duration::from_secs(parse_or(
                &lookup,
                "SWEEP_TIMEOUT_SECS",
                defaults.sweep_timeout.as_secs(),
            )?),
            ingest_timeout: Duration::from_secs(parse_or(
                &lookup,
                "INGEST_TIMEOUT_SECS",
                defaults.ingest_timeout.as_secs(),
            )?),
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            database_url: lookup("DATABASE_URL").context("Cannot load DATABASE_URL env variable")?,
            api_keys: lookup("API_KEYS").unwrap_or_default(),
            strava_access_token: lookup("STRAVA_ACCESS_TOKEN").filter(|t| !t.trim().is_empty()),
            strava_base_url: lookup("STRAVA_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            reference_offset,
            scheduler,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number", key)),
        None => Ok(default),
    }
}
