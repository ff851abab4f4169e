//! Configuration management for the a70q HAL
//!
//! Handles the TOML HAL configuration, device variant detection, system
//! property overrides and the recovery bootloader check.

mod bootloader;
mod properties;
mod variants;

pub use bootloader::{BootloaderError, MODEL_MARKER, verify_bootloader};
pub use properties::PropertyStore;
pub use variants::{
    DEFAULT_BUILD, DEFAULT_DEVICE, DEFAULT_MODEL, ModelIdentity, VARIANTS, Variant, detect_model,
};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Malformed property line {line}: {content}")]
    MalformedProperty { line: usize, content: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Standard configuration paths, searched in order
pub const VENDOR_CONFIG_DIR: &str = "/vendor/etc/a70q";
pub const CONFIG_DIR: &str = "/etc/a70q";
pub const CONFIG_FILE: &str = "hal.toml";

/// Audio adapter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSection {
    /// Client protocol major version (2 or 4)
    #[serde(default = "default_protocol_version")]
    pub protocol_version: u8,
    /// Master volume applied at bring-up, if any
    #[serde(default)]
    pub initial_master_volume: Option<f32>,
}

fn default_protocol_version() -> u8 {
    4
}

impl Default for AudioSection {
    fn default() -> Self {
        Self {
            protocol_version: default_protocol_version(),
            initial_master_volume: None,
        }
    }
}

/// Backlight settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySection {
    #[serde(default = "default_brightness_path")]
    pub brightness_path: PathBuf,
    #[serde(default = "default_sunlight_level")]
    pub sunlight_level: String,
    #[serde(default = "default_boost_level")]
    pub boost_level: String,
    /// Delay before the fingerprint boost is undone
    #[serde(default = "default_restore_delay_ms")]
    pub restore_delay_ms: u64,
}

fn default_brightness_path() -> PathBuf {
    PathBuf::from("/sys/class/backlight/panel0-backlight/brightness")
}

fn default_sunlight_level() -> String {
    "365".to_string()
}

fn default_boost_level() -> String {
    "319".to_string()
}

fn default_restore_delay_ms() -> u64 {
    400
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            brightness_path: default_brightness_path(),
            sunlight_level: default_sunlight_level(),
            boost_level: default_boost_level(),
            restore_delay_ms: default_restore_delay_ms(),
        }
    }
}

/// Touch panel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TouchSection {
    #[serde(default = "default_tsp_cmd_path")]
    pub cmd_path: PathBuf,
}

fn default_tsp_cmd_path() -> PathBuf {
    PathBuf::from("/sys/class/sec/tsp/cmd")
}

impl Default for TouchSection {
    fn default() -> Self {
        Self {
            cmd_path: default_tsp_cmd_path(),
        }
    }
}

/// System property settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertiesSection {
    /// Property holding the bootloader version string
    #[serde(default = "default_bootloader_property")]
    pub bootloader_property: String,
    /// Property file the overrides are written to
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

fn default_bootloader_property() -> String {
    "ro.bootloader".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/vendor/build.prop")
}

impl Default for PropertiesSection {
    fn default() -> Self {
        Self {
            bootloader_property: default_bootloader_property(),
            store_path: default_store_path(),
        }
    }
}

/// Main HAL configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HalConfig {
    #[serde(default)]
    pub audio: AudioSection,

    #[serde(default)]
    pub display: DisplaySection,

    #[serde(default)]
    pub touch: TouchSection,

    #[serde(default)]
    pub properties: PropertiesSection,
}

impl HalConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        for dir in [VENDOR_CONFIG_DIR, CONFIG_DIR] {
            let path = Path::new(dir).join(CONFIG_FILE);
            if path.exists() {
                return Self::load(&path);
            }
        }

        tracing::warn!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.audio.protocol_version, 2 | 4) {
            return Err(ConfigError::Invalid(format!(
                "unsupported audio protocol version {}",
                self.audio.protocol_version
            )));
        }
        if let Some(volume) = self.audio.initial_master_volume {
            if !(0.0..=1.0).contains(&volume) {
                return Err(ConfigError::Invalid(format!(
                    "initial master volume {} outside [0,1]",
                    volume
                )));
            }
        }
        Ok(())
    }
}
