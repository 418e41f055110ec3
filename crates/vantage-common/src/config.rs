//! Layered configuration.
//!
//! On-disk config is a TOML document where every field is optional; a pure
//! merge against the compiled-in defaults produces the fully-resolved
//! [`Config`] the rest of the system consumes. No scattered `None` checks
//! downstream.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(String),
}

/// On-disk shape: everything optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub display: RawDisplayLayout,
    pub overrides: RawOverrides,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawDisplayLayout {
    pub angle: Option<i32>,
    pub fov: Option<i32>,
    pub spacing: Option<f32>,
    pub count: Option<u32>,
    pub use_circular_spacing: Option<bool>,
    pub radius_multiplier: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOverrides {
    pub allow_unsupported_devices: Option<bool>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub refresh_rate: Option<u32>,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub display: DisplayLayout,
    pub overrides: Overrides,
}

/// How the virtual displays are arranged in space.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayLayout {
    /// Degrees of separation between adjacent displays.
    pub angle: i32,
    /// Vertical field of view, degrees.
    pub fov: i32,
    /// Extra spacing between displays, world units.
    pub spacing: f32,
    /// Number of virtual displays.
    pub count: u32,
    pub use_circular_spacing: bool,
    pub radius_multiplier: f32,
}

/// Escape hatches over detected display values. The dimension overrides stay
/// optional even after resolution: `None` means "trust the EDID".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub allow_unsupported_devices: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub refresh_rate: Option<u32>,
}

impl Default for DisplayLayout {
    fn default() -> Self {
        Self {
            angle: 45,
            fov: 45,
            spacing: 0.5,
            count: 3,
            use_circular_spacing: true,
            radius_multiplier: 1.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: DisplayLayout::default(),
            overrides: Overrides::default(),
        }
    }
}

impl RawConfig {
    /// Merge this partial config against the compiled-in defaults,
    /// field by field. Pure; no I/O, no mutation of `self`'s source.
    pub fn merge_defaults(self) -> Config {
        let defaults = Config::default();
        Config {
            display: DisplayLayout {
                angle: self.display.angle.unwrap_or(defaults.display.angle),
                fov: self.display.fov.unwrap_or(defaults.display.fov),
                spacing: self.display.spacing.unwrap_or(defaults.display.spacing),
                count: self.display.count.unwrap_or(defaults.display.count),
                use_circular_spacing: self
                    .display
                    .use_circular_spacing
                    .unwrap_or(defaults.display.use_circular_spacing),
                radius_multiplier: self
                    .display
                    .radius_multiplier
                    .unwrap_or(defaults.display.radius_multiplier),
            },
            overrides: Overrides {
                allow_unsupported_devices: self
                    .overrides
                    .allow_unsupported_devices
                    .unwrap_or(defaults.overrides.allow_unsupported_devices),
                width: self.overrides.width,
                height: self.overrides.height,
                refresh_rate: self.overrides.refresh_rate,
            },
        }
    }
}

impl Config {
    /// Load and resolve a config file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Load a config file, falling back to the compiled-in defaults when it
    /// does not exist. A malformed file is still an error: silently ignoring
    /// a typo'd config would be worse than failing.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found; using defaults");
                Ok(Config::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Parse and resolve a TOML document.
    pub fn parse(text: &str) -> Result<Config, ConfigError> {
        let raw: RawConfig =
            toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        Ok(raw.merge_defaults())
    }
}
