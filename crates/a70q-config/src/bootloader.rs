//! Recovery-time bootloader version check

use thiserror::Error;

/// Model marker searched for in the bootloader string
pub const MODEL_MARKER: &str = "A705";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BootloaderError {
    #[error("Failed to read current bootloader version")]
    Missing,

    #[error("Invalid supported bootloader argument: {0:?}")]
    InvalidArgument(String),

    #[error("Failed to parse current bootloader version: {0}")]
    Unrecognized(String),
}

/// Returns true when the installed bootloader needs an update.
///
/// The supported version is the first digit of `supported`. The installed
/// revision is the first digit after the model name, e.g. `5` in
/// `A705FNXXU5DWB4`; model digits directly after [`MODEL_MARKER`] (as in
/// `A7050`) are skipped. Without a revision digit the bootloader is treated
/// as needing an update.
pub fn verify_bootloader(bootloader: &str, supported: &str) -> Result<bool, BootloaderError> {
    if bootloader.is_empty() {
        return Err(BootloaderError::Missing);
    }
    let supported_version = supported
        .chars()
        .next()
        .and_then(|c| c.to_digit(10))
        .ok_or_else(|| BootloaderError::InvalidArgument(supported.to_string()))?;

    let offset = bootloader
        .find(MODEL_MARKER)
        .ok_or_else(|| BootloaderError::Unrecognized(bootloader.to_string()))?;

    let current = bootloader[offset + MODEL_MARKER.len()..]
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .chars()
        .find_map(|c| c.to_digit(10));

    let needs_update = match current {
        Some(revision) => revision > supported_version,
        None => true,
    };
    tracing::info!(
        "Bootloader {}: revision {:?}, supported {}, update needed: {}",
        bootloader,
        current,
        supported_version,
        needs_update
    );
    Ok(needs_update)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_digit() {
        assert_eq!(verify_bootloader("A705FNXXU5DWB4", "7"), Ok(false));
        assert_eq!(verify_bootloader("A705FNXXU5DWB4", "5"), Ok(false));
        assert_eq!(verify_bootloader("A705FNXXU5DWB4", "4"), Ok(true));
        assert_eq!(verify_bootloader("A705FNXXU1DWB4", "9"), Ok(false));
    }

    #[test]
    fn test_numeric_model_suffix_skipped() {
        assert_eq!(verify_bootloader("A7050ZCU5DWB4", "5"), Ok(false));
        assert_eq!(verify_bootloader("A7050ZCU6DWB4", "5"), Ok(true));
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(verify_bootloader("", "7"), Err(BootloaderError::Missing));
        assert!(matches!(
            verify_bootloader("A705FNXXU5DWB4", ""),
            Err(BootloaderError::InvalidArgument(_))
        ));
        assert!(matches!(
            verify_bootloader("A705FNXXU5DWB4", "x"),
            Err(BootloaderError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unknown_model() {
        assert!(matches!(
            verify_bootloader("G973FXXU9FVK1", "7"),
            Err(BootloaderError::Unrecognized(_))
        ));
    }

    #[test]
    fn test_no_revision_needs_update() {
        assert_eq!(verify_bootloader("xxA705", "9"), Ok(true));
        assert_eq!(verify_bootloader("A705FNXXU", "9"), Ok(true));
    }
}
