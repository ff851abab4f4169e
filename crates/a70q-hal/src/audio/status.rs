//! Vendor status translation
//!
//! Every vendor call result goes through [`analyze_status`].

use super::hw::Status;
use nix::errno::Errno;
use thiserror::Error;

/// Failure taxonomy reported to callers of the audio adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("invalid arguments")]
    InvalidArguments,

    #[error("invalid state")]
    InvalidState,

    #[error("not supported")]
    NotSupported,

    #[error("not initialized")]
    NotInitialized,

    #[error("unknown vendor status {0}")]
    Unknown(i32),
}

/// Audio adapter result type
pub type Result<T> = std::result::Result<T, AudioError>;

/// Map a vendor status to a result
///
/// Errno values listed in `ignore` mean the vendor lacks the feature: they map
/// to [`AudioError::NotSupported`] and are only logged at debug level.
pub fn analyze_status(class: &str, func: &str, status: Status, ignore: &[i32]) -> Result<()> {
    if status == 0 {
        return Ok(());
    }
    if status > 0 {
        tracing::warn!("Error from HAL {} in function {}: status {}", class, func, status);
        return Err(AudioError::Unknown(status));
    }

    let errno = -status;
    if ignore.contains(&errno) {
        tracing::debug!(
            "HAL {} function {} not supported: {}",
            class,
            func,
            Errno::from_raw(errno).desc()
        );
        return Err(AudioError::NotSupported);
    }

    tracing::warn!(
        "Error from HAL {} in function {}: {}",
        class,
        func,
        Errno::from_raw(errno).desc()
    );
    Err(errno_to_error(errno))
}

fn errno_to_error(errno: i32) -> AudioError {
    match errno {
        libc::EINVAL => AudioError::InvalidArguments,
        libc::ENODATA => AudioError::InvalidState,
        libc::ENODEV => AudioError::NotInitialized,
        libc::ENOSYS => AudioError::NotSupported,
        _ => AudioError::InvalidState,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        assert_eq!(analyze_status("Device", "init_check", 0, &[]), Ok(()));
    }

    #[test]
    fn test_errno_mapping() {
        let cases = [
            (-libc::EINVAL, AudioError::InvalidArguments),
            (-libc::ENODATA, AudioError::InvalidState),
            (-libc::ENODEV, AudioError::NotInitialized),
            (-libc::ENOSYS, AudioError::NotSupported),
            (-libc::EIO, AudioError::InvalidState),
        ];
        for (status, expected) in cases {
            assert_eq!(analyze_status("Device", "f", status, &[]), Err(expected));
        }
    }

    #[test]
    fn test_ignored_errors_are_not_supported() {
        assert_eq!(
            analyze_status("Device", "set_master_volume", -libc::EIO, &[libc::EIO]),
            Err(AudioError::NotSupported)
        );
        assert_eq!(
            analyze_status("Device", "set_master_volume", -libc::EINVAL, &[libc::ENOSYS]),
            Err(AudioError::InvalidArguments)
        );
    }

    #[test]
    fn test_positive_status_is_unknown() {
        assert_eq!(
            analyze_status("stream", "standby", 3, &[]),
            Err(AudioError::Unknown(3))
        );
    }
}
