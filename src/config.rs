//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the sea-level.toml file.
//! It provides a centralized way to configure the NOAA station and request settings,
//! the rolling-average window, and the OpenWeatherMap and GNews clients.
//!
//! API keys are plain configuration values. The binary may overlay keys read from
//! the environment with [`Config::apply_api_keys`]; library code never reads the
//! environment itself.

use crate::chunker::DEFAULT_MAX_SPAN_DAYS;
use crate::metrics::DEFAULT_WINDOW;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "sea-level.toml";

/// Application configuration loaded from sea-level.toml
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// NOAA station and data getter configuration
    pub noaa: NoaaConfig,
    /// Derived metric settings
    pub analysis: AnalysisConfig,
    /// OpenWeatherMap configuration
    pub openweather: OpenWeatherConfig,
    /// GNews headline search configuration
    pub gnews: GNewsConfig,
}

/// What the pipeline does when a chunk request fails in transit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportPolicy {
    /// The first failed chunk fails the whole request
    #[default]
    Abort,
    /// Failed chunks are skipped; the request fails only if every chunk fails
    SkipChunk,
}

/// NOAA tide station and request configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct NoaaConfig {
    /// NOAA station ID (e.g., "8518750" for The Battery, NY)
    pub station_id: String,
    /// Human-readable station name for reference
    pub station_name: String,
    /// Data getter endpoint
    pub api_url: String,
    /// Value of the `application` query parameter
    pub application: String,
    /// Optional token sent as a `token` header
    pub api_key: Option<String>,
    /// Largest span of a single request, in days
    pub max_span_days: u32,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Handling of chunk transport failures
    pub transport_policy: TransportPolicy,
    /// Skip chunks whose request timed out, regardless of `transport_policy`
    pub skip_timed_out_chunks: bool,
}

/// Derived metric settings
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Trailing rolling-average window, in samples
    pub rolling_window: usize,
}

/// OpenWeatherMap configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct OpenWeatherConfig {
    /// Base URL of the 2.5 API (`/weather` and `/forecast` are appended)
    pub api_url: String,
    /// API key (`appid`)
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

/// GNews headline search configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct GNewsConfig {
    /// Base URL of the v4 API (`/search` is appended)
    pub api_url: String,
    /// API key (`token`)
    pub api_key: Option<String>,
    /// Search expression
    pub query: String,
    /// Article language code
    pub lang: String,
    /// Country code the search is restricted to
    pub country: String,
    /// Number of headlines to request
    pub max_articles: u32,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for NoaaConfig {
    fn default() -> Self {
        NoaaConfig {
            station_id: "8518750".to_string(),
            station_name: "The Battery, NY".to_string(),
            api_url: "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter".to_string(),
            application: "sea_level_tracker".to_string(),
            api_key: None,
            max_span_days: DEFAULT_MAX_SPAN_DAYS,
            request_timeout_secs: 30,
            transport_policy: TransportPolicy::Abort,
            skip_timed_out_chunks: false,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            rolling_window: DEFAULT_WINDOW,
        }
    }
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        OpenWeatherConfig {
            api_url: "https://api.openweathermap.org/data/2.5".to_string(),
            api_key: None,
            request_timeout_secs: 15,
        }
    }
}

impl Default for GNewsConfig {
    fn default() -> Self {
        GNewsConfig {
            api_url: "https://gnews.io/api/v4".to_string(),
            api_key: None,
            query: "weather OR climate OR forecast OR cyclone OR monsoon OR flood".to_string(),
            lang: "en".to_string(),
            country: "in".to_string(),
            max_articles: 5,
            request_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(
                        "Loaded configuration for station: {} ({})",
                        config.noaa.station_name, config.noaa.station_id
                    );
                    config
                }
                Err(e) => {
                    warn!("Invalid config file format in {}: {}", path.display(), e);
                    warn!("Using default configuration (The Battery, NY)");
                    Self::default()
                }
            },
            Err(_) => {
                info!(
                    "No config file at {}, using default configuration (The Battery, NY)",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Overlay API keys obtained elsewhere (typically the environment).
    ///
    /// `None` leaves the configured key untouched; empty strings are ignored.
    pub fn apply_api_keys(
        &mut self,
        noaa: Option<String>,
        openweather: Option<String>,
        gnews: Option<String>,
    ) {
        let usable = |key: Option<String>| key.filter(|k| !k.trim().is_empty());
        if let Some(key) = usable(noaa) {
            self.noaa.api_key = Some(key);
        }
        if let Some(key) = usable(openweather) {
            self.openweather.api_key = Some(key);
        }
        if let Some(key) = usable(gnews) {
            self.gnews.api_key = Some(key);
        }
    }

    /// Save current configuration to `path`
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Write the built-in defaults to `path`.
    ///
    /// An existing file is left alone unless `force` is set.
    pub fn write_default<P: AsRef<Path>>(path: P, force: bool) -> anyhow::Result<()> {
        let path = path.as_ref();
        if path.exists() && !force {
            anyhow::bail!(
                "{} already exists; pass --force to overwrite it",
                path.display()
            );
        }
        Self::default().save_to_path(path)
    }
}
