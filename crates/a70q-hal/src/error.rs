//! Errors of the sysfs-backed HAL pieces

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HalError {
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    #[error("Unknown gesture: {0}")]
    UnknownGesture(i32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
