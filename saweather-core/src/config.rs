use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::model::{Accuracy, Coordinate, LocationPolicy, PlaceQuery};

pub const DEFAULT_FALLBACK_CITY: &str = "Johannesburg";
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_LOCATION_TIMEOUT_MS: u64 = 15_000;

/// State of the desktop stand-in for a device location service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// `None` until the user has answered the permission prompt.
    pub permission_granted: Option<bool>,
    pub last_known: Option<Coordinate>,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// fallback_city = "Johannesburg"
/// location_timeout_ms = 15000
///
/// [device]
/// permission_granted = true
/// last_known = { latitude = -26.2, longitude = 28.04 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub fallback_city: String,
    pub location_timeout_ms: u64,
    pub location_interval_ms: u64,
    pub location_fastest_interval_ms: u64,
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Account the lookups are recorded under.
    pub owner_id: Option<String>,
    pub device: DeviceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            fallback_city: DEFAULT_FALLBACK_CITY.to_string(),
            location_timeout_ms: DEFAULT_LOCATION_TIMEOUT_MS,
            location_interval_ms: 10_000,
            location_fastest_interval_ms: 5_000,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 10,
            owner_id: None,
            device: DeviceConfig::default(),
        }
    }
}

impl Config {
    /// Returns the API key, or an error hinting how to configure one.
    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No OpenWeather API key configured.\n\
                     Hint: run `saweather configure` or set SAWEATHER_API_KEY."
                )
            })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    /// The fallback city as a validated place query.
    pub fn fallback_place(&self) -> Result<PlaceQuery> {
        PlaceQuery::new(self.fallback_city.as_str())
            .context("Configured fallback_city must not be empty")
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn location_policy(&self) -> LocationPolicy {
        LocationPolicy {
            accuracy: Accuracy::High,
            interval: Duration::from_millis(self.location_interval_ms),
            fastest_interval: Duration::from_millis(self.location_fastest_interval_ms),
        }
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "saweather", "saweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path of the lookup history written by [`crate::sink::JsonlSink`].
    pub fn history_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("history.jsonl"))
    }
}
