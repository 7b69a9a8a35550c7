//! Configuration file support for cbti.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/cbti/config.toml`.

use crate::clock::DayBoundaryPolicy;
use crate::{Error, Result, WindowAnchor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub titration: TitrationConfig,

    #[serde(default)]
    pub day_boundary: DayBoundaryPolicy,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Titration thresholds and window limits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TitrationConfig {
    #[serde(default = "default_increment_minutes")]
    pub increment_minutes: u32,

    #[serde(default = "default_min_window_minutes")]
    pub min_window_minutes: u32,

    #[serde(default = "default_min_days_logged")]
    pub min_days_logged: u32,

    #[serde(default = "default_high_confidence_days")]
    pub high_confidence_days: u32,

    #[serde(default = "default_increase_threshold")]
    pub increase_threshold: f64,

    #[serde(default = "default_maintain_threshold")]
    pub maintain_threshold: f64,

    #[serde(default = "default_review_threshold")]
    pub review_threshold: f64,

    #[serde(default)]
    pub default_anchor: WindowAnchor,

    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

impl Default for TitrationConfig {
    fn default() -> Self {
        Self {
            increment_minutes: default_increment_minutes(),
            min_window_minutes: default_min_window_minutes(),
            min_days_logged: default_min_days_logged(),
            high_confidence_days: default_high_confidence_days(),
            increase_threshold: default_increase_threshold(),
            maintain_threshold: default_maintain_threshold(),
            review_threshold: default_review_threshold(),
            default_anchor: WindowAnchor::default(),
            window_days: default_window_days(),
        }
    }
}

impl TitrationConfig {
    /// Reject thresholds that would make the decision table skip a band
    pub fn validate(&self) -> Result<()> {
        if self.increment_minutes == 0 {
            return Err(Error::Config("increment_minutes must be positive".into()));
        }
        if self.window_days == 0 {
            return Err(Error::Config("window_days must be positive".into()));
        }
        if !(self.review_threshold <= self.maintain_threshold
            && self.maintain_threshold <= self.increase_threshold)
        {
            return Err(Error::Config(format!(
                "thresholds must satisfy review ({}) <= maintain ({}) <= increase ({})",
                self.review_threshold, self.maintain_threshold, self.increase_threshold
            )));
        }
        Ok(())
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("cbti")
}

fn default_increment_minutes() -> u32 {
    15
}

fn default_min_window_minutes() -> u32 {
    300
}

fn default_min_days_logged() -> u32 {
    3
}

fn default_high_confidence_days() -> u32 {
    5
}

fn default_increase_threshold() -> f64 {
    90.0
}

fn default_maintain_threshold() -> f64 {
    85.0
}

fn default_review_threshold() -> f64 {
    80.0
}

fn default_window_days() -> u32 {
    7
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.titration.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("cbti").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
