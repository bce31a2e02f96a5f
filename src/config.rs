use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::link::LinkConfig;

// Config errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to write config file: {0}")]
    WriteError(String),
}

/// Frame pacing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Minimum time between two panel repaints in milliseconds
    pub min_interval_ms: u64,

    /// Keep the current source line scrolled into view
    pub auto_scroll: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 50,
            auto_scroll: false,
        }
    }
}

/// Clock speed bounds accepted by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedConfig {
    pub min: u32,
    pub max: u32,

    /// Speed announced on startup
    pub initial: u32,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            min: 1,
            max: 2500,
            initial: 1,
        }
    }
}

impl SpeedConfig {
    /// Clamp a requested speed into the configured bounds.
    pub fn clamp(&self, requested: i64) -> u32 {
        requested.clamp(i64::from(self.min), i64::from(self.max)) as u32
    }
}

/// Complete panel configuration, persisted as TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub speed: SpeedConfig,

    #[serde(default)]
    pub link: LinkConfig,
}

impl PanelConfig {
    /// Path of the config file under the platform config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("simpanel")
            .join("config.toml")
    }

    /// Load the config file, writing defaults on first start.
    ///
    /// A broken file is reported and replaced by defaults for this run, but
    /// never overwritten; the user's edits stay on disk.
    pub fn load_or_default() -> Self {
        let path = Self::default_path();

        match fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!(
                        "Unparseable config at {}: {}, using defaults",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config at {}, writing defaults", path.display());
                let config = Self::default();
                if let Err(e) = config.write_to(&path) {
                    warn!("Could not persist default config: {}", e);
                }
                config
            }
        }
    }

    fn write_to(&self, path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }
        let raw =
            toml::to_string_pretty(self).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        fs::write(path, raw).map_err(|e| ConfigError::WriteError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_clamps_into_bounds() {
        let speed = SpeedConfig::default();

        assert_eq!(speed.clamp(0), 1);
        assert_eq!(speed.clamp(3000), 2500);
        assert_eq!(speed.clamp(500), 500);
        assert_eq!(speed.clamp(-17), 1);
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = PanelConfig::default();
        let raw = toml::to_string_pretty(&config).unwrap();
        let parsed: PanelConfig = toml::from_str(&raw).unwrap();

        assert_eq!(parsed, config);
        assert_eq!(parsed.render.min_interval_ms, 50);
        assert_eq!(parsed.speed.max, 2500);
    }

    #[test]
    fn partial_file_fills_missing_sections() {
        let parsed: PanelConfig =
            toml::from_str("[render]\nmin_interval_ms = 25\nauto_scroll = true\n").unwrap();

        assert_eq!(parsed.render.min_interval_ms, 25);
        assert!(parsed.render.auto_scroll);
        assert_eq!(parsed.speed, SpeedConfig::default());
        assert_eq!(parsed.link, LinkConfig::default());
    }
}
