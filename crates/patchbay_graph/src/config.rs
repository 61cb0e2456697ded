// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tunables for wiring gestures, loadable from RON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Pointer travel, in canvas units, that turns a press on a wired port into
/// a disconnect
pub const DEFAULT_DISCONNECT_THRESHOLD: f32 = 10.0;

/// Radius around a port's connection point that counts as pressing it
pub const DEFAULT_PORT_HIT_RADIUS: f32 = 9.0;

/// Config errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the file failed
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The RON was malformed
    #[error("Failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// A value is out of range
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Gesture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Travel before a disconnect commits
    pub disconnect_threshold: f32,
    /// Farthest a candidate port may be from the pointer; `None` is unlimited
    pub snap_radius: Option<f32>,
    /// Press radius around a port
    pub port_hit_radius: f32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            disconnect_threshold: DEFAULT_DISCONNECT_THRESHOLD,
            snap_radius: None,
            port_hit_radius: DEFAULT_PORT_HIT_RADIUS,
        }
    }
}

impl ConnectionConfig {
    /// Parse from a RON string
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&text)?;
        tracing::debug!("Loaded connection config from {}", path.display());
        Ok(config)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Check every value is in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.disconnect_threshold.is_nan() || self.disconnect_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "disconnect_threshold must be non-negative, got {}",
                self.disconnect_threshold
            )));
        }
        if self.port_hit_radius.is_nan() || self.port_hit_radius <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "port_hit_radius must be positive, got {}",
                self.port_hit_radius
            )));
        }
        if let Some(radius) = self.snap_radius {
            if radius.is_nan() || radius <= 0.0 {
                return Err(ConfigError::Invalid(format!("snap_radius must be positive, got {radius}")));
            }
        }
        Ok(())
    }
}
