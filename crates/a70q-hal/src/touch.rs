//! Touchscreen gestures
//!
//! Gestures are toggled by writing commands to the touch panel (TSP) command
//! node.

use crate::{HalError, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub const TSP_CMD_PATH: &str = "/sys/class/sec/tsp/cmd";

/// A gesture the panel can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gesture {
    pub id: i32,
    pub name: &'static str,
    pub keycode: i32,
}

const GESTURES: &[Gesture] = &[Gesture {
    id: 0,
    name: "Single Tap",
    keycode: 0x1c7,
}];

/// Touch configuration
#[derive(Debug, Clone)]
pub struct TouchConfig {
    pub cmd_path: PathBuf,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            cmd_path: PathBuf::from(TSP_CMD_PATH),
        }
    }
}

pub struct TouchscreenGesture {
    cmd_path: PathBuf,
}

impl TouchscreenGesture {
    pub fn new(config: &TouchConfig) -> Self {
        Self {
            cmd_path: config.cmd_path.clone(),
        }
    }

    pub fn is_supported(&self) -> bool {
        File::open(&self.cmd_path).is_ok()
    }

    pub fn supported_gestures(&self) -> Vec<Gesture> {
        GESTURES.to_vec()
    }

    pub fn set_gesture_enabled(&self, gesture_id: i32, enabled: bool) -> Result<()> {
        let gesture = GESTURES
            .iter()
            .find(|g| g.id == gesture_id)
            .ok_or(HalError::UnknownGesture(gesture_id))?;

        // sysfs node: never create or truncate
        let mut node = OpenOptions::new().write(true).open(&self.cmd_path)?;
        write!(node, "singletap_enable,{}", u8::from(enabled))?;
        tracing::debug!(
            "Gesture {} {}",
            gesture.name,
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn test_gesture_table() {
        let touch = TouchscreenGesture::new(&TouchConfig::default());
        let gestures = touch.supported_gestures();
        assert_eq!(gestures.len(), 1);
        assert_eq!(gestures[0].keycode, 0x1c7);
        assert_eq!(gestures[0].name, "Single Tap");
    }

    #[test]
    fn test_enable_writes_command() {
        let file = NamedTempFile::new().unwrap();
        let touch = TouchscreenGesture::new(&TouchConfig {
            cmd_path: file.path().to_path_buf(),
        });
        assert!(touch.is_supported());

        touch.set_gesture_enabled(0, true).unwrap();
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "singletap_enable,1");
    }

    #[test]
    fn test_unknown_gesture() {
        let file = NamedTempFile::new().unwrap();
        let touch = TouchscreenGesture::new(&TouchConfig {
            cmd_path: file.path().to_path_buf(),
        });
        assert!(matches!(
            touch.set_gesture_enabled(5, true),
            Err(HalError::UnknownGesture(5))
        ));
    }

    #[test]
    fn test_missing_node() {
        let touch = TouchscreenGesture::new(&TouchConfig {
            cmd_path: PathBuf::from("/nonexistent/tsp/cmd"),
        });
        assert!(!touch.is_supported());
        assert!(matches!(touch.set_gesture_enabled(0, false), Err(HalError::Io(_))));
    }
}
