use anyhow::{Context, Result, bail};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// How raw messages arrive: a mock random-walk generator, or NDJSON lines
/// on stdin. The transport itself is deliberately dumb; all derivation
/// happens downstream in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Mock,
    Stdin,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Mode::Mock),
            "stdin" => Ok(Mode::Stdin),
            _ => bail!("Invalid MODE: {}. Must be 'mock' or 'stdin'", s),
        }
    }
}

pub const DEFAULT_SYMBOLS: &str = "AAPL,GOOGL,MSFT,AMZN,TSLA";

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub symbols: Vec<String>,
    pub database_url: String,
    /// |z| above which an event is anomalous.
    pub z_score_threshold: f64,
    /// Recent prices read per detector evaluation.
    pub history_limit: usize,
    pub candle_ttl_days: i64,
    pub price_ttl_days: i64,
    /// Optional webhook for alert delivery; log-only sink when unset.
    pub alert_webhook_url: Option<String>,
    pub mock_interval_ms: u64,
    pub purge_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = get("MODE")
            .unwrap_or_else(|| "mock".to_string())
            .parse::<Mode>()?;

        let symbols = parse_symbols(&get("SYMBOLS").unwrap_or_else(|| DEFAULT_SYMBOLS.to_string()));
        if symbols.is_empty() {
            bail!("SYMBOLS must list at least one symbol");
        }

        let database_url =
            get("DATABASE_URL").unwrap_or_else(|| "sqlite://data/finpulse.db".to_string());

        let z_score_threshold: f64 = parse_or(&get, "Z_SCORE_THRESHOLD", 2.5)?;
        if z_score_threshold <= 0.0 {
            bail!("Z_SCORE_THRESHOLD must be positive, got {}", z_score_threshold);
        }

        let history_limit: usize = parse_or(&get, "HISTORY_LIMIT", 30)?;
        if history_limit < 2 {
            bail!("HISTORY_LIMIT must be at least 2, got {}", history_limit);
        }

        Ok(Self {
            mode,
            symbols,
            database_url,
            z_score_threshold,
            history_limit,
            candle_ttl_days: parse_or(&get, "CANDLE_TTL_DAYS", 30)?,
            price_ttl_days: parse_or(&get, "PRICE_TTL_DAYS", 7)?,
            alert_webhook_url: get("ALERT_WEBHOOK_URL").filter(|s| !s.trim().is_empty()),
            mock_interval_ms: parse_or(&get, "MOCK_INTERVAL_MS", 1_000)?,
            purge_interval_secs: parse_or(&get, "PURGE_INTERVAL_SECS", 3_600)?,
        })
    }
}

fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
