//! Display helpers
//!
//! Sunlight enhancement and the fingerprint brightness boost, both driven
//! through the panel backlight brightness node.

use crate::{HalError, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

pub const BACKLIGHT_BRIGHTNESS_PATH: &str = "/sys/class/backlight/panel0-backlight/brightness";

/// Backlight level used by sunlight enhancement
pub const SUNLIGHT_LEVEL: &str = "365";

/// Backlight level held while a finger is on the sensor
pub const BOOST_LEVEL: &str = "319";

pub const BOOST_RESTORE_DELAY: Duration = Duration::from_millis(400);

/// Display configuration
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub brightness_path: PathBuf,
    pub sunlight_level: String,
    pub boost_level: String,
    pub restore_delay: Duration,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            brightness_path: PathBuf::from(BACKLIGHT_BRIGHTNESS_PATH),
            sunlight_level: SUNLIGHT_LEVEL.into(),
            boost_level: BOOST_LEVEL.into(),
            restore_delay: BOOST_RESTORE_DELAY,
        }
    }
}

fn read_brightness(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// High brightness mode for outdoor use
pub struct SunlightEnhancement {
    path: PathBuf,
    level: String,
    previous: Mutex<Option<String>>,
}

impl SunlightEnhancement {
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            path: config.brightness_path.clone(),
            level: config.sunlight_level.clone(),
            previous: Mutex::new(None),
        }
    }

    /// Supported when the brightness node opens for read and write
    pub fn is_supported(&self) -> bool {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .is_ok()
    }

    pub fn is_enabled(&self) -> bool {
        read_brightness(&self.path).as_deref() == Some(self.level.as_str())
    }

    /// Enable saves the current brightness; disable puts it back
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        if !self.is_supported() {
            return Err(HalError::Unsupported(format!(
                "sunlight enhancement ({})",
                self.path.display()
            )));
        }
        let mut previous = self.previous.lock().unwrap_or_else(PoisonError::into_inner);
        if enabled {
            *previous = read_brightness(&self.path);
            fs::write(&self.path, &self.level)?;
            tracing::info!("Sunlight enhancement on (saved {:?})", *previous);
        } else if let Some(level) = previous.as_deref() {
            fs::write(&self.path, level)?;
            tracing::info!("Sunlight enhancement off, brightness back to {}", level);
        }
        Ok(())
    }
}

/// Brightness boost while the under-display fingerprint sensor is touched
pub struct BrightnessBoost {
    path: PathBuf,
    level: String,
    restore_delay: Duration,
    previous: Arc<Mutex<Option<String>>>,
}

impl BrightnessBoost {
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            path: config.brightness_path.clone(),
            level: config.boost_level.clone(),
            restore_delay: config.restore_delay,
            previous: Arc::new(Mutex::new(None)),
        }
    }

    /// Boost now, restore the previous brightness after the delay
    ///
    /// The restore runs on a detached thread.
    #[allow(clippy::collapsible_if)] // Avoid if-let chains for MSRV 1.85 compatibility
    pub fn on_finger_down(&self) -> Result<()> {
        {
            let mut previous = self.previous.lock().unwrap_or_else(PoisonError::into_inner);
            *previous = read_brightness(&self.path);
        }
        fs::write(&self.path, &self.level)?;
        tracing::debug!("Brightness boosted to {}", self.level);

        let path = self.path.clone();
        let delay = self.restore_delay;
        let previous = Arc::clone(&self.previous);
        thread::spawn(move || {
            thread::sleep(delay);
            let saved = previous
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(level) = saved {
                if let Err(e) = fs::write(&path, &level) {
                    tracing::warn!("Failed to restore brightness {}: {}", level, e);
                }
            }
        });
        Ok(())
    }

    /// Whether a restore is still pending
    pub fn is_boosted(&self) -> bool {
        self.previous
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn config(file: &NamedTempFile) -> DisplayConfig {
        DisplayConfig {
            brightness_path: file.path().to_path_buf(),
            restore_delay: Duration::from_millis(20),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = DisplayConfig::default();
        assert_eq!(config.sunlight_level, "365");
        assert_eq!(config.boost_level, "319");
        assert_eq!(config.restore_delay, Duration::from_millis(400));
    }

    #[test]
    fn test_sunlight_toggle() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "120\n").unwrap();
        let sunlight = SunlightEnhancement::new(&config(&file));

        assert!(sunlight.is_supported());
        assert!(!sunlight.is_enabled());
        sunlight.set_enabled(true).unwrap();
        assert!(sunlight.is_enabled());
        sunlight.set_enabled(false).unwrap();
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "120");
    }

    #[test]
    fn test_disable_without_saved_value() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "80").unwrap();
        let sunlight = SunlightEnhancement::new(&config(&file));
        sunlight.set_enabled(false).unwrap();
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "80");
    }

    #[test]
    fn test_missing_node_unsupported() {
        let config = DisplayConfig {
            brightness_path: PathBuf::from("/nonexistent/brightness"),
            ..Default::default()
        };
        let sunlight = SunlightEnhancement::new(&config);
        assert!(!sunlight.is_supported());
        assert!(matches!(
            sunlight.set_enabled(true),
            Err(HalError::Unsupported(_))
        ));
    }

    #[test]
    fn test_boost_restores_after_delay() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "200").unwrap();
        let boost = BrightnessBoost::new(&config(&file));

        boost.on_finger_down().unwrap();
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "319");
        assert!(boost.is_boosted());

        thread::sleep(Duration::from_millis(300));
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "200");
        assert!(!boost.is_boosted());
    }
}
