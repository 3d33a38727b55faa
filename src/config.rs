//! Runtime configuration
//!
//! Built once at startup from `{data_dir}/config.toml` (optional) and passed
//! by reference to the scheduler, the storage and the session driver.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::review::IntervalTable;

const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Data directory not found")]
    DataDirNotFound,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Shape of the review interval table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct IntervalConfig {
    /// Growth factor between consecutive levels
    pub base: f64,
    /// Interval of level 1, in hours
    pub unit_hours: u32,
    /// Number of levels above 0
    pub steps: u32,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            base: 2.09,
            unit_hours: 24,
            steps: 12,
        }
    }
}

impl IntervalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.base <= 1.0 || !self.base.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "intervals.base must be greater than 1, got {}",
                self.base
            )));
        }
        if self.unit_hours == 0 {
            return Err(ConfigError::Invalid("intervals.unit_hours must be positive".into()));
        }
        if self.steps == 0 {
            return Err(ConfigError::Invalid("intervals.steps must be positive".into()));
        }
        Ok(())
    }

    /// Build the interval table this configuration describes
    pub fn table(&self) -> Result<IntervalTable> {
        self.validate()?;
        IntervalTable::geometric(Duration::hours(self.unit_hours as i64), self.base, self.steps)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Session limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct SessionConfig {
    /// Maximum number of connects presented in one session
    pub max_items: usize,
    /// Optional wall-clock budget in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_minutes: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_items: 80,
            budget_minutes: None,
        }
    }
}

/// External audio player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct PlayerConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: "mpv".to_string(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    #[serde(skip)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub intervals: IntervalConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub player: PlayerConfig,
}

impl Config {
    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|p| p.join("recall"))
            .ok_or(ConfigError::DataDirNotFound)
    }

    /// Defaults rooted at `data_dir`
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            intervals: IntervalConfig::default(),
            session: SessionConfig::default(),
            player: PlayerConfig::default(),
        }
    }

    /// Read `config.toml` from the data directory, falling back to defaults
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = match fs::read_to_string(&path) {
            Ok(content) => {
                log::info!("Using configuration from {:?}", path);
                toml::from_str::<Config>(&content)?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::with_data_dir(PathBuf::new()),
            Err(e) => return Err(e.into()),
        };
        config.data_dir = data_dir.to_path_buf();
        config.intervals.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(temp.path()).unwrap();
        assert_eq!(config.data_dir, temp.path());
        assert_eq!(config.intervals, IntervalConfig::default());
        assert_eq!(config.session.max_items, 80);
        assert_eq!(config.player.command, "mpv");
    }

    #[test]
    fn test_partial_file_overrides() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "[session]\nmax_items = 20\nbudget_minutes = 15\n\n[intervals]\nsteps = 8\n",
        )
        .unwrap();

        let config = Config::load(temp.path()).unwrap();
        assert_eq!(config.session.max_items, 20);
        assert_eq!(config.session.budget_minutes, Some(15));
        assert_eq!(config.intervals.steps, 8);
        assert_eq!(config.intervals.base, 2.09);
        assert_eq!(config.intervals.table().unwrap().max_level(), 8);
    }

    #[test]
    fn test_invalid_base_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "[intervals]\nbase = 0.5\n").unwrap();
        assert!(matches!(
            Config::load(temp.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "[session\n").unwrap();
        assert!(matches!(Config::load(temp.path()), Err(ConfigError::Toml(_))));
    }
}
