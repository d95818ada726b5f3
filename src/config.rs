//! Compositor configuration
//!
//! Settings are read from the JSON file named by `TERN_CONFIG`, when set,
//! and then overridden by environment variables:
//!
//! - `TERN_SEAT` (falling back to `XDG_SEAT`): seat to open
//! - `TERN_VT`: virtual terminal to run on

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::{info, warn};

pub const DEFAULT_SEAT: &str = "seat0";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub seat: String,
    /// VT to run on; the current one when unset.
    pub vt: Option<u32>,
    pub xkb: XkbConfig,
    /// Virtual outputs of the headless platform.
    pub outputs: Vec<OutputConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seat: DEFAULT_SEAT.to_string(),
            vt: None,
            xkb: XkbConfig::default(),
            outputs: vec![OutputConfig::default()],
        }
    }
}

/// Keymap names, empty strings select the xkbcommon defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct XkbConfig {
    pub rules: String,
    pub model: String,
    pub layout: String,
    pub variant: String,
    pub options: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub name: String,
    pub width: i32,
    pub height: i32,
    /// Millihertz.
    pub refresh: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            name: "Virtual-1".to_string(),
            width: 1920,
            height: 1080,
            refresh: 60_000,
        }
    }
}

impl OutputConfig {
    /// Frame interval derived from the refresh rate, ~60Hz if unset.
    pub fn refresh_interval(&self) -> std::time::Duration {
        if self.refresh <= 0 {
            return std::time::Duration::from_micros(16_667);
        }
        std::time::Duration::from_nanos(1_000_000_000_000 / self.refresh as u64)
    }
}

impl Config {
    /// Load from `TERN_CONFIG` and the environment.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var_os("TERN_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("could not parse config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(seat) = var("TERN_SEAT").or_else(|| var("XDG_SEAT")) {
            if !seat.is_empty() {
                self.seat = seat;
            }
        }
        if let Some(vt) = var("TERN_VT") {
            match vt.parse() {
                Ok(vt) => self.vt = Some(vt),
                Err(_) => warn!("Ignoring invalid TERN_VT: {:?}", vt),
            }
        }
    }
}
