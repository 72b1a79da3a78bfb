//! Configuration file management for radioscope.
//!
//! The config file is optional. Every key in it is optional too: the
//! `[visualizer]` table feeds the visualizer builder, so anything left out
//! falls back to the built-in defaults.

use crate::visualizer::VisualizerConfigBuilder;
use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Commented default config written by `radioscope config`.
pub const DEFAULT_CONFIG: &str = include_str!("../../environments/radioscope.toml");

/// Now-playing polling configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataConfig {
    /// Seconds between metadata probes
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Seconds before a single probe is abandoned
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_timeout_secs() -> u64 {
    5
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl MetadataConfig {
    /// Poll interval, never shorter than one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Probe timeout, never shorter than one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RadioscopeConfig {
    /// Stream to play when none is given on the command line
    #[serde(default)]
    pub stream_url: Option<String>,
    #[serde(default)]
    pub visualizer: VisualizerConfigBuilder,
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl RadioscopeConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the config file exists but cannot be read
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        let config_path = config_path()?;
        if !config_path.exists() {
            tracing::debug!("No config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", config_path.display()))?;
        tracing::debug!("Configuration loaded from {}", config_path.display());
        Ok(config)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    /// - If the TOML is malformed or contains unknown keys
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Retrieves the path to the config file, `~/.config/radioscope/radioscope.toml`.
///
/// # Errors
/// - If the home directory cannot be determined
pub fn config_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home
        .join(".config")
        .join("radioscope")
        .join("radioscope.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RadioscopeConfig::from_toml("").unwrap();
        assert_eq!(config, RadioscopeConfig::default());
        assert_eq!(config.metadata.poll_interval(), Duration::from_secs(3));
        assert_eq!(config.metadata.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_default_template_parses() {
        let config = RadioscopeConfig::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, RadioscopeConfig::default());
    }

    #[test]
    fn test_partial_visualizer_table() {
        let config = RadioscopeConfig::from_toml(
            r##"
            stream_url = "http://radio.example/stream"

            [visualizer]
            width = 80
            smooth_factor = 0.0
            glyph = "#"

            [metadata]
            poll_interval_secs = 10
            "##,
        )
        .unwrap();

        assert_eq!(config.stream_url.as_deref(), Some("http://radio.example/stream"));
        assert_eq!(config.metadata.poll_interval_secs, 10);
        assert_eq!(config.metadata.timeout_secs, 5);

        let visualizer = config.visualizer.build().unwrap();
        assert_eq!(visualizer.width(), 80);
        assert_eq!(visualizer.height(), 12);
        assert_eq!(visualizer.smooth_factor(), 0.0);
        assert_eq!(visualizer.glyph(), "#");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(RadioscopeConfig::from_toml("[visualizer]\nwidht = 10\n").is_err());
    }

    #[test]
    fn test_zero_intervals_are_raised() {
        let metadata = MetadataConfig {
            poll_interval_secs: 0,
            timeout_secs: 0,
        };
        assert_eq!(metadata.poll_interval(), Duration::from_secs(1));
        assert_eq!(metadata.timeout(), Duration::from_secs(1));
    }
}
