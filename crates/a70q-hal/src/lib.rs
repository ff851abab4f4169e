//! Hardware Abstraction Layer (HAL) for the Galaxy A70 (a70q)
//!
//! Adapts the vendor audio library to the platform audio protocol and
//! provides the small sysfs-backed device features.
//!
//! # Example
//!
//! ```no_run
//! use a70q_hal::display::{DisplayConfig, SunlightEnhancement};
//!
//! fn main() -> a70q_hal::Result<()> {
//!     let sunlight = SunlightEnhancement::new(&DisplayConfig::default());
//!     if sunlight.is_supported() {
//!         sunlight.set_enabled(true)?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod display;
pub mod error;
pub mod mock;
pub mod touch;

pub use display::{BrightnessBoost, DisplayConfig, SunlightEnhancement};
pub use error::HalError;
pub use touch::{Gesture, TouchConfig, TouchscreenGesture};

/// HAL Result type
pub type Result<T> = std::result::Result<T, HalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hal_imports() {
        let _ = std::mem::size_of::<audio::Device>();
        let _ = std::mem::size_of::<TouchscreenGesture>();
    }
}
