//! Audio HAL adaptation layer
//!
//! Bridges the client-facing audio protocol (two major versions) to the
//! vendor audio library's function table.
//!
//! # Example
//!
//! ```no_run
//! use a70q_hal::audio::{Device, EffectRegistry, ProtocolVersion};
//! use a70q_hal::mock::MockAudioHw;
//! use a70q_hal::audio::hw::HwApiVersion;
//! use std::sync::Arc;
//!
//! let hw = MockAudioHw::new(HwApiVersion::V3_0);
//! let device = Device::new(Box::new(hw), ProtocolVersion::V4, Arc::new(EffectRegistry::new()));
//! device.set_master_volume(0.8).ok();
//! ```

pub mod address;
pub mod capability;
pub mod device;
pub mod effects;
pub mod hw;
pub mod parameters;
pub mod status;
pub mod stream;
pub mod types;

pub use address::{AddressData, AddressParseError, DeviceAddress};
pub use device::{Device, DeviceLifecycle, OpenedStream, ProtocolVersion};
pub use effects::{EffectHandle, EffectRegistry};
pub use status::{AudioError, Result};
pub use stream::{Stream, StreamDirection};
pub use types::*;
