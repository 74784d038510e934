use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_MARKUP_PERCENTAGE: f64 = 3.0;
pub const DEFAULT_CACHE_DURATION: u64 = 3600;
pub const MIN_CACHE_DURATION: u64 = 300;
pub const MAX_CACHE_DURATION: u64 = 86400;

pub const PRIMARY_URL: &str =
    "https://www.bangkokbank.com/en/Personal/Other-Services/View-Rates/Foreign-Exchange-Rates";
pub const ALTERNATE_URL: &str = "https://api.exchangerate-api.com/v4/latest/THB";
pub const BACKUP_URL: &str = "https://open.er-api.com/v6/latest/THB";

/// Per-fetch settings. Values are clamped into range on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchOptions {
    pub markup_percentage: f64,
    pub cache_duration: u64,
}

impl FetchOptions {
    pub fn new(markup_percentage: f64, cache_duration: u64) -> Self {
        let markup_percentage = if markup_percentage.is_finite() {
            markup_percentage.clamp(0.0, 100.0)
        } else {
            DEFAULT_MARKUP_PERCENTAGE
        };
        Self {
            markup_percentage,
            cache_duration: cache_duration.clamp(MIN_CACHE_DURATION, MAX_CACHE_DURATION),
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::new(DEFAULT_MARKUP_PERCENTAGE, DEFAULT_CACHE_DURATION)
    }
}

fn default_markup_percentage() -> f64 {
    DEFAULT_MARKUP_PERCENTAGE
}

fn default_cache_duration() -> u64 {
    DEFAULT_CACHE_DURATION
}

fn default_display_currencies() -> Vec<String> {
    ["USD", "EUR", "GBP", "JPY", "CNY", "AUD", "SGD"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RatesConfig {
    #[serde(default = "default_markup_percentage")]
    pub markup_percentage: f64,
    #[serde(default = "default_cache_duration")]
    pub cache_duration: u64,
    /// Codes shown in the rates table. Conversions accept any code.
    #[serde(default = "default_display_currencies")]
    pub display_currencies: Vec<String>,
}

impl RatesConfig {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::new(self.markup_percentage, self.cache_duration)
    }
}

impl Default for RatesConfig {
    fn default() -> Self {
        RatesConfig {
            markup_percentage: DEFAULT_MARKUP_PERCENTAGE,
            cache_duration: DEFAULT_CACHE_DURATION,
            display_currencies: default_display_currencies(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl SourceConfig {
    pub fn new(url: &str, timeout_secs: u64) -> Self {
        Self {
            url: url.to_string(),
            timeout_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_primary() -> SourceConfig {
    SourceConfig::new(PRIMARY_URL, 30)
}

fn default_alternate() -> SourceConfig {
    SourceConfig::new(ALTERNATE_URL, 10)
}

fn default_backup() -> SourceConfig {
    SourceConfig::new(BACKUP_URL, 10)
}

fn default_probe_timeout_secs() -> u64 {
    2
}

fn default_verify_tls() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourcesConfig {
    #[serde(default = "default_primary")]
    pub primary: SourceConfig,
    #[serde(default = "default_alternate")]
    pub alternate: SourceConfig,
    #[serde(default = "default_backup")]
    pub backup: SourceConfig,
    /// Forwarding endpoint; when set every fetch is relayed through it.
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
}

impl SourcesConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        SourcesConfig {
            primary: default_primary(),
            alternate: default_alternate(),
            backup: default_backup(),
            proxy_url: None,
            probe_timeout_secs: default_probe_timeout_secs(),
            verify_tls: default_verify_tls(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

impl AppConfig {
    /// Loads the default config file, or built-in defaults if there is none.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("th", "bahtrates", "baht-rates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
