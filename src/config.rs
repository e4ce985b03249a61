use crate::constants::*;
use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    pub geocoder: GeocoderConfig,
    pub weather: WeatherConfig,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Index page N lives at `{index_url}{N}/`
    pub index_url: String,
    pub event_link_prefix: String,
    pub page_delay_ms: u64,
    pub max_pages: Option<u32>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            event_link_prefix: DEFAULT_EVENT_LINK_PREFIX.to_string(),
            page_delay_ms: 0,
            max_pages: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: 20,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

/// What the geocoder reports when a venue has no candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodeFallback {
    /// Substitute the configured default location
    DefaultLocation,
    /// Leave the record without coordinates (and without weather)
    Absent,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub city_qualifier: String,
    pub fallback: GeocodeFallback,
    pub default_latitude: f64,
    pub default_longitude: f64,
    /// 0 disables throttling
    pub requests_per_min: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEOCODER_URL.to_string(),
            city_qualifier: DEFAULT_CITY_QUALIFIER.to_string(),
            fallback: GeocodeFallback::DefaultLocation,
            default_latitude: SEATTLE_LATITUDE,
            default_longitude: SEATTLE_LONGITUDE,
            requests_per_min: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEATHER_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Detail pipelines allowed in flight at once
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
        }
    }
}

impl Config {
    /// Reads `path` if it exists, falls back to defaults otherwise, then applies
    /// environment overrides and validates.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                ScraperError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            Self::from_toml(&content)?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `lookup` is injected so tests don't have to touch the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("SEATTLE_EVENTS_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(db) = lookup("SEATTLE_EVENTS_DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(db);
        }
        if let Some(agent) = lookup("SEATTLE_EVENTS_USER_AGENT") {
            self.http.user_agent = agent;
        }
        if let Some(raw) = lookup("SEATTLE_EVENTS_CONCURRENCY") {
            self.pipeline.concurrency = raw.trim().parse().map_err(|e| {
                ScraperError::Config(format!(
                    "SEATTLE_EVENTS_CONCURRENCY must be a positive integer, got '{raw}': {e}"
                ))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.concurrency == 0 {
            return Err(ScraperError::Config(
                "pipeline.concurrency must be at least 1".into(),
            ));
        }
        if self.http.timeout_seconds == 0 {
            return Err(ScraperError::Config(
                "http.timeout_seconds must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("crawler.index_url", &self.crawler.index_url),
            ("crawler.event_link_prefix", &self.crawler.event_link_prefix),
            ("geocoder.base_url", &self.geocoder.base_url),
            ("weather.base_url", &self.weather.base_url),
        ] {
            if value.trim().is_empty() {
                return Err(ScraperError::Config(format!("{name} must not be empty")));
            }
        }
        if !(-90.0..=90.0).contains(&self.geocoder.default_latitude)
            || !(-180.0..=180.0).contains(&self.geocoder.default_longitude)
        {
            return Err(ScraperError::Config(format!(
                "default location ({}, {}) is not a valid coordinate",
                self.geocoder.default_latitude, self.geocoder.default_longitude
            )));
        }
        Ok(())
    }
}
