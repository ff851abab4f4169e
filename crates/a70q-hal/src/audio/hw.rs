//! Vendor audio library interface
//!
//! The vendor exposes a C-style function table. Mandatory entries are plain
//! trait methods; optional entries return `Option` and default to `None`,
//! which stands for an absent function pointer. Statuses follow the
//! zero-or-negative-errno convention.

use super::address::{self, DeviceAddress};
use super::effects::EffectHandle;
use super::types::{
    AUDIO_GAIN_VALUES_MAX, AudioConfig, AudioDevice, AudioFormat, AudioGainConfig, AudioPort,
    AudioPortConfig, AudioProfile, ChannelMask, PortEndpoint, PortRole, SinkMetadata,
    SourceMetadata,
};
use std::os::fd::BorrowedFd;

/// Vendor status code: zero on success, negative errno on failure
pub type Status = libc::c_int;

/// Capacity of the vendor microphone array
pub const AUDIO_MICROPHONE_MAX_COUNT: usize = 32;

/// Capacity of a vendor frequency response curve
pub const AUDIO_MICROPHONE_MAX_FREQUENCY_RESPONSES: usize = 256;

pub const HW_CHANNEL_MAPPING_UNUSED: u32 = 0;
pub const HW_CHANNEL_MAPPING_DIRECT: u32 = 1;
pub const HW_CHANNEL_MAPPING_PROCESSED: u32 = 2;

pub const HW_LOCATION_UNKNOWN: u32 = 0;
pub const HW_LOCATION_MAINBODY: u32 = 1;
pub const HW_LOCATION_MAINBODY_MOVABLE: u32 = 2;
pub const HW_LOCATION_PERIPHERAL: u32 = 3;

pub const HW_DIRECTIONALITY_UNKNOWN: u32 = 0;
pub const HW_DIRECTIONALITY_OMNI: u32 = 1;
pub const HW_DIRECTIONALITY_BI_DIRECTIONAL: u32 = 2;
pub const HW_DIRECTIONALITY_CARDIOID: u32 = 3;
pub const HW_DIRECTIONALITY_HYPER_CARDIOID: u32 = 4;
pub const HW_DIRECTIONALITY_SUPER_CARDIOID: u32 = 5;

const HW_PORT_ROLE_NONE: u32 = 0;
const HW_PORT_ROLE_SOURCE: u32 = 1;
const HW_PORT_ROLE_SINK: u32 = 2;

/// API version reported by the vendor device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HwApiVersion {
    pub major: u8,
    pub minor: u8,
}

impl HwApiVersion {
    pub const V2_0: Self = Self::new(2, 0);
    /// First version with audio patches and port configs
    pub const V3_0: Self = Self::new(3, 0);
    /// First version with device effects
    pub const V3_1: Self = Self::new(3, 1);

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

/// Stream configuration in vendor form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HwAudioConfig {
    pub sample_rate: u32,
    pub channel_mask: u32,
    pub format: u32,
    pub frame_count: u64,
}

impl From<&AudioConfig> for HwAudioConfig {
    fn from(config: &AudioConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channel_mask: config.channel_mask.0,
            format: config.format.0,
            frame_count: config.frame_count,
        }
    }
}

impl HwAudioConfig {
    /// Convert back to protocol form
    ///
    /// Fails when the vendor suggested a format outside the known set; the
    /// converted value is still returned so callers can report it.
    pub fn to_config(&self) -> Result<AudioConfig, AudioConfig> {
        let config = AudioConfig {
            sample_rate: self.sample_rate,
            channel_mask: ChannelMask(self.channel_mask),
            format: AudioFormat(self.format),
            frame_count: self.frame_count,
        };
        if config.format == AudioFormat::DEFAULT || config.format.name().is_some() {
            Ok(config)
        } else {
            Err(config)
        }
    }
}

/// Gain settings in vendor form
#[derive(Debug, Clone, PartialEq)]
pub struct HwGainConfig {
    pub index: i32,
    pub mode: u32,
    pub channel_mask: u32,
    pub values: [i32; AUDIO_GAIN_VALUES_MAX],
    pub ramp_duration_ms: u32,
}

/// Port endpoint in vendor form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HwPortExt {
    Device { device: u32, address: String },
    Mix { io_handle: i32 },
    Session { session: i32 },
}

/// Port config in vendor form
#[derive(Debug, Clone, PartialEq)]
pub struct HwPortConfig {
    pub id: i32,
    pub role: u32,
    pub ext: HwPortExt,
    pub sample_rate: u32,
    pub channel_mask: u32,
    pub format: u32,
    pub gain: Option<HwGainConfig>,
}

/// Port description in vendor form
#[derive(Debug, Clone, PartialEq)]
pub struct HwAudioPort {
    pub id: i32,
    pub role: u32,
    pub name: String,
    pub ext: HwPortExt,
    /// (format, sample rates, channel masks)
    pub profiles: Vec<(u32, Vec<u32>, Vec<u32>)>,
    pub active_config: Option<HwPortConfig>,
}

/// 3D coordinate in vendor form
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HwCoordinate {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// One entry of the vendor microphone array
#[derive(Debug, Clone, PartialEq)]
pub struct HwMicrophoneCharacteristic {
    pub device_id: String,
    pub device: u32,
    pub address: String,
    pub channel_mapping: [u32; super::types::AUDIO_CHANNEL_COUNT_MAX],
    pub location: u32,
    pub group: i32,
    pub index_in_the_group: u32,
    pub sensitivity: f32,
    pub max_spl: f32,
    pub min_spl: f32,
    pub directionality: u32,
    pub num_frequency_responses: usize,
    /// Row 0 holds frequencies, row 1 the matching levels
    pub frequency_responses: [[f32; AUDIO_MICROPHONE_MAX_FREQUENCY_RESPONSES]; 2],
    pub geometric_location: HwCoordinate,
    pub orientation: HwCoordinate,
}

impl Default for HwMicrophoneCharacteristic {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            device: 0,
            address: String::new(),
            channel_mapping: [HW_CHANNEL_MAPPING_UNUSED; super::types::AUDIO_CHANNEL_COUNT_MAX],
            location: HW_LOCATION_UNKNOWN,
            group: 0,
            index_in_the_group: 0,
            sensitivity: 0.0,
            max_spl: 0.0,
            min_spl: 0.0,
            directionality: HW_DIRECTIONALITY_UNKNOWN,
            num_frequency_responses: 0,
            frequency_responses: [[0.0; AUDIO_MICROPHONE_MAX_FREQUENCY_RESPONSES]; 2],
            geometric_location: HwCoordinate::default(),
            orientation: HwCoordinate::default(),
        }
    }
}

/// Vendor audio device function table
pub trait HwDevice: Send {
    fn api_version(&self) -> HwApiVersion;

    fn init_check(&self) -> Status;

    fn set_mic_mute(&mut self, mute: bool) -> Status;

    fn mic_mute(&self) -> (Status, bool);

    /// Buffer size for a capture config, zero when unsupported
    fn input_buffer_size(&self, config: &HwAudioConfig) -> usize;

    /// Open a playback stream. The config may be adjusted even on failure.
    fn open_output_stream(
        &mut self,
        io_handle: i32,
        devices: u32,
        flags: u32,
        config: &mut HwAudioConfig,
        address: &str,
    ) -> Result<Box<dyn HwStream>, Status>;

    /// Open a capture stream. The config may be adjusted even on failure.
    #[allow(clippy::too_many_arguments)]
    fn open_input_stream(
        &mut self,
        io_handle: i32,
        devices: u32,
        config: &mut HwAudioConfig,
        flags: u32,
        address: &str,
        source: u32,
    ) -> Result<Box<dyn HwStream>, Status>;

    fn close_output_stream(&mut self, stream: Box<dyn HwStream>);

    fn close_input_stream(&mut self, stream: Box<dyn HwStream>);

    /// `key=value;...` reply for the `;`-separated keys, `None` on failure
    fn get_parameters(&self, keys: &str) -> Option<String>;

    fn set_parameters(&mut self, key_values: &str) -> Status;

    fn dump(&self, fd: BorrowedFd<'_>) -> Status;

    /// Release the device. Called at most once.
    fn close(&mut self) -> Status;

    fn set_master_volume(&mut self, _volume: f32) -> Option<Status> {
        None
    }

    fn master_volume(&self) -> Option<(Status, f32)> {
        None
    }

    fn set_master_mute(&mut self, _mute: bool) -> Option<Status> {
        None
    }

    fn master_mute(&self) -> Option<(Status, bool)> {
        None
    }

    /// Create a patch, or update the one named by `handle`, storing the result in it
    fn create_audio_patch(
        &mut self,
        _sources: &[HwPortConfig],
        _sinks: &[HwPortConfig],
        _handle: &mut i32,
    ) -> Option<Status> {
        None
    }

    fn release_audio_patch(&mut self, _handle: i32) -> Option<Status> {
        None
    }

    fn get_audio_port(&self, _port: &mut HwAudioPort) -> Option<Status> {
        None
    }

    fn set_audio_port_config(&mut self, _config: &HwPortConfig) -> Option<Status> {
        None
    }

    /// Fill `mics` and set `count` to the number of valid entries
    fn get_microphones(
        &self,
        _mics: &mut [HwMicrophoneCharacteristic],
        _count: &mut usize,
    ) -> Option<Status> {
        None
    }

    fn add_device_effect(&mut self, _port: i32, _effect: EffectHandle) -> Option<Status> {
        None
    }

    fn remove_device_effect(&mut self, _port: i32, _effect: EffectHandle) -> Option<Status> {
        None
    }
}

/// Vendor audio stream function table
pub trait HwStream: Send {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u32;

    fn format(&self) -> u32;

    fn buffer_size(&self) -> usize;

    fn standby(&mut self) -> Status;

    fn dump(&self, fd: BorrowedFd<'_>) -> Status;

    fn get_parameters(&self, keys: &str) -> Option<String>;

    fn set_parameters(&mut self, key_values: &str) -> Status;

    fn add_audio_effect(&mut self, effect: EffectHandle) -> Status;

    fn remove_audio_effect(&mut self, effect: EffectHandle) -> Status;

    fn update_source_metadata(&mut self, _metadata: &SourceMetadata) -> Option<()> {
        None
    }

    fn update_sink_metadata(&mut self, _metadata: &SinkMetadata) -> Option<()> {
        None
    }
}

pub(crate) fn role_to_hal(role: PortRole) -> u32 {
    match role {
        PortRole::None => HW_PORT_ROLE_NONE,
        PortRole::Source => HW_PORT_ROLE_SOURCE,
        PortRole::Sink => HW_PORT_ROLE_SINK,
    }
}

pub(crate) fn role_from_hal(role: u32) -> PortRole {
    match role {
        HW_PORT_ROLE_SOURCE => PortRole::Source,
        HW_PORT_ROLE_SINK => PortRole::Sink,
        _ => PortRole::None,
    }
}

fn endpoint_to_hal(endpoint: &PortEndpoint) -> HwPortExt {
    match endpoint {
        PortEndpoint::Device(address) => HwPortExt::Device {
            device: address.device.bits(),
            address: address::encode(address),
        },
        PortEndpoint::Mix { io_handle } => HwPortExt::Mix {
            io_handle: *io_handle,
        },
        PortEndpoint::Session { session } => HwPortExt::Session { session: *session },
    }
}

fn endpoint_from_hal(ext: &HwPortExt) -> PortEndpoint {
    match ext {
        HwPortExt::Device { device, address } => {
            let device = AudioDevice(*device);
            let address = address::decode(device, address).unwrap_or_else(|e| {
                tracing::warn!("Port address from vendor not decodable: {}", e);
                DeviceAddress::new(device)
            });
            PortEndpoint::Device(address)
        }
        HwPortExt::Mix { io_handle } => PortEndpoint::Mix {
            io_handle: *io_handle,
        },
        HwPortExt::Session { session } => PortEndpoint::Session { session: *session },
    }
}

/// Convert a port config, `None` when its gain carries too many values
pub(crate) fn port_config_to_hal(config: &AudioPortConfig) -> Option<HwPortConfig> {
    let gain = match &config.gain {
        Some(gain) => Some(gain_to_hal(gain)?),
        None => None,
    };

    Some(HwPortConfig {
        id: config.id,
        role: role_to_hal(config.role),
        ext: endpoint_to_hal(&config.endpoint),
        sample_rate: config.sample_rate,
        channel_mask: config.channel_mask.0,
        format: config.format.0,
        gain,
    })
}

fn gain_to_hal(gain: &AudioGainConfig) -> Option<HwGainConfig> {
    if gain.values.len() > AUDIO_GAIN_VALUES_MAX {
        return None;
    }
    let mut values = [0; AUDIO_GAIN_VALUES_MAX];
    values[..gain.values.len()].copy_from_slice(&gain.values);

    Some(HwGainConfig {
        index: gain.index,
        mode: gain.mode,
        channel_mask: gain.channel_mask.0,
        values,
        ramp_duration_ms: gain.ramp_duration_ms,
    })
}

pub(crate) fn port_config_from_hal(config: &HwPortConfig) -> AudioPortConfig {
    AudioPortConfig {
        id: config.id,
        role: role_from_hal(config.role),
        endpoint: endpoint_from_hal(&config.ext),
        sample_rate: config.sample_rate,
        channel_mask: ChannelMask(config.channel_mask),
        format: AudioFormat(config.format),
        gain: config.gain.as_ref().map(|g| AudioGainConfig {
            index: g.index,
            mode: g.mode,
            channel_mask: ChannelMask(g.channel_mask),
            values: g.values
                [..(ChannelMask(g.channel_mask).channel_count() as usize).min(AUDIO_GAIN_VALUES_MAX)]
                .to_vec(),
            ramp_duration_ms: g.ramp_duration_ms,
        }),
    }
}

pub(crate) fn port_to_hal(port: &AudioPort) -> HwAudioPort {
    HwAudioPort {
        id: port.id,
        role: role_to_hal(port.role),
        name: port.name.clone(),
        ext: endpoint_to_hal(&port.endpoint),
        profiles: Vec::new(),
        active_config: None,
    }
}

pub(crate) fn port_from_hal(port: &HwAudioPort) -> AudioPort {
    AudioPort {
        id: port.id,
        role: role_from_hal(port.role),
        name: port.name.clone(),
        endpoint: endpoint_from_hal(&port.ext),
        profiles: port
            .profiles
            .iter()
            .map(|(format, rates, masks)| AudioProfile {
                format: AudioFormat(*format),
                sample_rates: rates.clone(),
                channel_masks: masks.iter().map(|m| ChannelMask(*m)).collect(),
            })
            .collect(),
        active_config: port.active_config.as_ref().map(port_config_from_hal),
    }
}
