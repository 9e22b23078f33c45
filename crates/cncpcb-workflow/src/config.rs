//! Persisted, explicit configuration.
//!
//! Replaces scattered process-wide mutable flags (`dump_wire`,
//! `require_z_level_at_tool_change`, the last-used serial port) with a
//! single struct that round-trips through TOML.

use cncpcb_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Whole-process configuration for one CNC control core instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Serial device path last used to connect (e.g. `/dev/ttyUSB0`).
    pub port: Option<String>,
    /// Baud rate for the serial link.
    pub baud_rate: u32,
    /// Echo every line written to and read from the controller.
    pub dump_wire: bool,
    /// Reject a tool change unless the height map has been probed since
    /// the last Z-adjust was set.
    pub require_z_level_at_tool_change: bool,
    /// Constant Z offset applied by the job runner's "apply Z adjustment"
    /// pipeline stage.
    pub z_adjust: f64,
    /// Horizontal mirror applied to newly acquired orientations.
    pub mirror: bool,
    /// Default spindle speed for `spindle on` with no explicit RPM.
    pub default_spindle_speed: f64,
    /// Default feed rate used by `shape` commands.
    pub default_feed_rate: f64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            port: None,
            baud_rate: 115_200,
            dump_wire: false,
            require_z_level_at_tool_change: false,
            z_adjust: 0.0,
            mirror: false,
            default_spindle_speed: 1000.0,
            default_feed_rate: 100.0,
        }
    }
}

impl CoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// The platform config file path: `<config dir>/cncpcb/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let mut dir = dirs::config_dir().ok_or_else(|| Error::other("no config directory for this platform"))?;
        dir.push("cncpcb");
        dir.push("config.toml");
        Ok(dir)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CoreConfig =
            toml::from_str(&content).map_err(|e| Error::other(format!("invalid config at {path:?}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| Error::other(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(Error::other("baud rate must be > 0"));
        }
        if self.default_feed_rate <= 0.0 {
            return Err(Error::other("default feed rate must be > 0"));
        }
        Ok(())
    }
}
