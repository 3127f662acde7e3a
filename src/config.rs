use anyhow::{anyhow, Context, Result};
use chrono::Local;
use std::env;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::models::layer::{FOLDER_YEARS, YEAR_RANGE};

pub static DEFAULT_CDN_HOST: &str = "geacron.b-cdn.net";
pub static DEFAULT_STORE_ROOT: &str = "./img";
pub static DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_LAYER_DELAY: Duration = Duration::from_millis(2500);

/// Settings for one run, fixed at startup and shared read-only by every layer task.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_root: PathBuf,
    pub cdn_host: String,
    /// `YYYYMMDD` of the day the run started, sent as `?v=` to get past CDN caches.
    pub cache_buster: String,
    pub concurrency: usize,
    pub years: RangeInclusive<u16>,
    pub request_timeout: Duration,
    pub layer_delay: Duration,
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from(DEFAULT_STORE_ROOT),
            cdn_host: DEFAULT_CDN_HOST.to_string(),
            cache_buster: today_cache_buster(),
            concurrency: num_cpus::get(),
            years: YEAR_RANGE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            layer_delay: DEFAULT_LAYER_DELAY,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

pub fn today_cache_buster() -> String {
    Local::now().format("%Y%m%d").to_string()
}

impl Config {
    /// Reads `TILE_*` variables from the environment (and `.env`, once loaded), falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();
        let first_year = parse_var(&var, "TILE_FIRST_YEAR")?.unwrap_or(*defaults.years.start());
        let last_year = parse_var(&var, "TILE_LAST_YEAR")?.unwrap_or(*defaults.years.end());
        let config = Config {
            store_root: var("TILE_STORE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_root),
            cdn_host: var("TILE_CDN_HOST").unwrap_or(defaults.cdn_host),
            cache_buster: defaults.cache_buster,
            concurrency: parse_var(&var, "TILE_CONCURRENCY")?.unwrap_or(defaults.concurrency),
            years: first_year..=last_year,
            request_timeout: parse_var(&var, "TILE_REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            layer_delay: parse_var(&var, "TILE_LAYER_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.layer_delay),
            log_dir: var("TILE_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(anyhow!("concurrency must be at least 1"));
        }
        if self.years.is_empty() {
            return Err(anyhow!(
                "first year {} is after last year {}",
                self.years.start(),
                self.years.end()
            ));
        }
        if !FOLDER_YEARS.contains(self.years.start()) || !FOLDER_YEARS.contains(self.years.end()) {
            return Err(anyhow!(
                "years must be between 1 and 9999, got {}..={}",
                self.years.start(),
                self.years.end()
            ));
        }
        if self.cdn_host.is_empty() {
            return Err(anyhow!("CDN host must not be empty"));
        }
        Ok(())
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {}: {:?}", key, value))
        })
        .transpose()
}
