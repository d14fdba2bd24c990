use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    forecast::{DEFAULT_FORECAST_TIMEOUT, DEFAULT_FORECAST_URL, FieldSet},
    geocode::{DEFAULT_GEOCODING_TIMEOUT, DEFAULT_GEOCODING_URL},
    locate::{DEFAULT_AUTO_LOCATE_BUDGET, IpProviderId, provider::DEFAULT_IP_LOOKUP_TIMEOUT},
};

/// Service base URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub forecast_url: String,
    pub geocoding_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
        }
    }
}

/// Per-call timeouts. Each outbound request carries its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub forecast_secs: u64,
    pub geocoding_secs: u64,
    pub ip_lookup_millis: u64,
    pub auto_locate_budget_millis: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            forecast_secs: DEFAULT_FORECAST_TIMEOUT.as_secs(),
            geocoding_secs: DEFAULT_GEOCODING_TIMEOUT.as_secs(),
            ip_lookup_millis: DEFAULT_IP_LOOKUP_TIMEOUT.as_millis() as u64,
            auto_locate_budget_millis: DEFAULT_AUTO_LOCATE_BUDGET.as_millis() as u64,
        }
    }
}

impl Timeouts {
    pub fn forecast(&self) -> Duration {
        Duration::from_secs(self.forecast_secs)
    }

    pub fn geocoding(&self) -> Duration {
        Duration::from_secs(self.geocoding_secs)
    }

    pub fn ip_lookup(&self) -> Duration {
        Duration::from_millis(self.ip_lookup_millis)
    }

    pub fn auto_locate_budget(&self) -> Duration {
        Duration::from_millis(self.auto_locate_budget_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoLocateConfig {
    pub enabled: bool,

    /// Provider ids raced on startup, e.g. `["ipapi", "ipinfo"]`.
    pub providers: Vec<String>,
}

impl Default for AutoLocateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            providers: IpProviderId::all().iter().map(|id| id.as_str().to_string()).collect(),
        }
    }
}

/// Top-level configuration. Every key is optional on disk.
///
/// Example TOML:
/// ```toml
/// variant = "minimal"
///
/// [timeouts]
/// forecast_secs = 5
///
/// [auto_locate]
/// providers = ["ipinfo", "ipwhois"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub variant: FieldSet,
    pub endpoints: Endpoints,
    pub timeouts: Timeouts,
    pub auto_locate: AutoLocateConfig,
}

impl Config {
    /// Configured auto-locate providers as strongly-typed ids.
    pub fn ip_providers(&self) -> Result<Vec<IpProviderId>> {
        self.auto_locate
            .providers
            .iter()
            .map(|name| IpProviderId::try_from(name.as_str()))
            .collect()
    }

    /// Reject values that would make every request fail immediately.
    pub fn validate(&self) -> Result<()> {
        let t = &self.timeouts;
        for (name, value) in [
            ("forecast_secs", t.forecast_secs),
            ("geocoding_secs", t.geocoding_secs),
            ("ip_lookup_millis", t.ip_lookup_millis),
            ("auto_locate_budget_millis", t.auto_locate_budget_millis),
        ] {
            if value == 0 {
                bail!("Timeout '{name}' must be greater than zero");
            }
        }

        for (name, url) in [
            ("forecast_url", &self.endpoints.forecast_url),
            ("geocoding_url", &self.endpoints.geocoding_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("Endpoint '{name}' must be an http(s) URL, got '{url}'");
            }
        }

        self.ip_providers()?;
        Ok(())
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "jweather", "jweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
