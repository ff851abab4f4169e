//! Protocol-level audio types
//!
//! Bit values follow the platform `system/audio.h` layout so they can be
//! handed to the vendor library without translation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a vendor device address, including the NUL terminator
pub const AUDIO_DEVICE_MAX_ADDRESS_LEN: usize = 32;

/// Maximum number of channels described by a microphone or gain config
pub const AUDIO_CHANNEL_COUNT_MAX: usize = 30;

/// Maximum number of gain values in a port gain config
pub const AUDIO_GAIN_VALUES_MAX: usize = 32;

/// Patch handle meaning "create a new patch"
pub const AUDIO_PATCH_HANDLE_NONE: i32 = 0;

/// Audio device type bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioDevice(pub u32);

impl AudioDevice {
    pub const NONE: Self = Self(0);
    pub const BIT_IN: u32 = 0x8000_0000;

    pub const OUT_EARPIECE: Self = Self(0x1);
    pub const OUT_SPEAKER: Self = Self(0x2);
    pub const OUT_WIRED_HEADSET: Self = Self(0x4);
    pub const OUT_WIRED_HEADPHONE: Self = Self(0x8);
    pub const OUT_BLUETOOTH_SCO: Self = Self(0x10);
    pub const OUT_BLUETOOTH_A2DP: Self = Self(0x80);
    pub const OUT_BLUETOOTH_A2DP_HEADPHONES: Self = Self(0x100);
    pub const OUT_BLUETOOTH_A2DP_SPEAKER: Self = Self(0x200);
    pub const OUT_HDMI: Self = Self(0x400);
    pub const OUT_USB_ACCESSORY: Self = Self(0x2000);
    pub const OUT_USB_DEVICE: Self = Self(0x4000);
    pub const OUT_REMOTE_SUBMIX: Self = Self(0x8000);
    pub const OUT_TELEPHONY_TX: Self = Self(0x10000);
    pub const OUT_IP: Self = Self(0x80_0000);
    pub const OUT_BUS: Self = Self(0x100_0000);
    pub const OUT_USB_HEADSET: Self = Self(0x400_0000);

    pub const IN_BUILTIN_MIC: Self = Self(Self::BIT_IN | 0x4);
    pub const IN_WIRED_HEADSET: Self = Self(Self::BIT_IN | 0x10);
    pub const IN_BACK_MIC: Self = Self(Self::BIT_IN | 0x80);
    pub const IN_REMOTE_SUBMIX: Self = Self(Self::BIT_IN | 0x100);
    pub const IN_USB_ACCESSORY: Self = Self(Self::BIT_IN | 0x800);
    pub const IN_USB_DEVICE: Self = Self(Self::BIT_IN | 0x1000);
    pub const IN_BLUETOOTH_A2DP: Self = Self(Self::BIT_IN | 0x2_0000);
    pub const IN_IP: Self = Self(Self::BIT_IN | 0x8_0000);
    pub const IN_BUS: Self = Self(Self::BIT_IN | 0x10_0000);
    pub const IN_USB_HEADSET: Self = Self(Self::BIT_IN | 0x200_0000);

    /// Raw bitmask
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Whether this is a capture device
    pub fn is_input(self) -> bool {
        self.0 & Self::BIT_IN != 0
    }

    /// Bitmask with the direction bit cleared
    pub fn without_direction(self) -> u32 {
        self.0 & !Self::BIT_IN
    }
}

impl fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Sample format tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioFormat(pub u32);

impl AudioFormat {
    pub const DEFAULT: Self = Self(0);
    pub const PCM_16_BIT: Self = Self(0x1);
    pub const PCM_8_BIT: Self = Self(0x2);
    pub const PCM_32_BIT: Self = Self(0x3);
    pub const PCM_8_24_BIT: Self = Self(0x4);
    pub const PCM_FLOAT: Self = Self(0x5);
    pub const PCM_24_BIT_PACKED: Self = Self(0x6);
    pub const MP3: Self = Self(0x0100_0000);
    pub const AAC_LC: Self = Self(0x0400_0002);

    const NAMES: &'static [(&'static str, AudioFormat)] = &[
        ("AUDIO_FORMAT_PCM_16_BIT", Self::PCM_16_BIT),
        ("AUDIO_FORMAT_PCM_8_BIT", Self::PCM_8_BIT),
        ("AUDIO_FORMAT_PCM_32_BIT", Self::PCM_32_BIT),
        ("AUDIO_FORMAT_PCM_8_24_BIT", Self::PCM_8_24_BIT),
        ("AUDIO_FORMAT_PCM_FLOAT", Self::PCM_FLOAT),
        ("AUDIO_FORMAT_PCM_24_BIT_PACKED", Self::PCM_24_BIT_PACKED),
        ("AUDIO_FORMAT_MP3", Self::MP3),
        ("AUDIO_FORMAT_AAC_LC", Self::AAC_LC),
    ];

    /// Parse a format from its platform name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(n, _)| *n == name.trim())
            .map(|(_, f)| *f)
    }

    /// Platform name, if known
    pub fn name(self) -> Option<&'static str> {
        Self::NAMES.iter().find(|(_, f)| *f == self).map(|(n, _)| *n)
    }

    /// Bytes per sample for linear PCM formats
    pub fn bytes_per_sample(self) -> Option<usize> {
        match self {
            Self::PCM_16_BIT => Some(2),
            Self::PCM_8_BIT => Some(1),
            Self::PCM_32_BIT | Self::PCM_8_24_BIT | Self::PCM_FLOAT => Some(4),
            Self::PCM_24_BIT_PACKED => Some(3),
            _ => None,
        }
    }
}

/// Channel mask bitfield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelMask(pub u32);

impl ChannelMask {
    pub const NONE: Self = Self(0);
    pub const OUT_MONO: Self = Self(0x1);
    pub const OUT_STEREO: Self = Self(0x3);
    pub const OUT_QUAD: Self = Self(0x33);
    pub const OUT_5POINT1: Self = Self(0x3F);
    pub const OUT_7POINT1: Self = Self(0x63F);
    pub const IN_MONO: Self = Self(0x10);
    pub const IN_STEREO: Self = Self(0xC);
    pub const IN_FRONT_BACK: Self = Self(0x30);

    const NAMES: &'static [(&'static str, ChannelMask)] = &[
        ("AUDIO_CHANNEL_OUT_MONO", Self::OUT_MONO),
        ("AUDIO_CHANNEL_OUT_STEREO", Self::OUT_STEREO),
        ("AUDIO_CHANNEL_OUT_QUAD", Self::OUT_QUAD),
        ("AUDIO_CHANNEL_OUT_5POINT1", Self::OUT_5POINT1),
        ("AUDIO_CHANNEL_OUT_7POINT1", Self::OUT_7POINT1),
        ("AUDIO_CHANNEL_IN_MONO", Self::IN_MONO),
        ("AUDIO_CHANNEL_IN_STEREO", Self::IN_STEREO),
        ("AUDIO_CHANNEL_IN_FRONT_BACK", Self::IN_FRONT_BACK),
    ];

    /// Parse a channel mask from its platform name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(n, _)| *n == name.trim())
            .map(|(_, m)| *m)
    }

    /// Number of channels in the mask
    pub fn channel_count(self) -> u32 {
        self.0.count_ones()
    }
}

/// Negotiated stream configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channel_mask: ChannelMask,
    pub format: AudioFormat,
    #[serde(default)]
    pub frame_count: u64,
}

/// Output stream flags bitfield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputFlags(pub u32);

impl OutputFlags {
    pub const NONE: Self = Self(0);
    pub const DIRECT: Self = Self(0x1);
    pub const PRIMARY: Self = Self(0x2);
    pub const FAST: Self = Self(0x4);
    pub const DEEP_BUFFER: Self = Self(0x8);
    pub const COMPRESS_OFFLOAD: Self = Self(0x10);
}

/// Input stream flags bitfield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputFlags(pub u32);

impl InputFlags {
    pub const NONE: Self = Self(0);
    pub const FAST: Self = Self(0x1);
    pub const HW_HOTWORD: Self = Self(0x2);
    pub const RAW: Self = Self(0x4);
}

/// Capture source tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioSource {
    #[default]
    Default,
    Mic,
    VoiceUplink,
    VoiceDownlink,
    VoiceCall,
    Camcorder,
    VoiceRecognition,
    VoiceCommunication,
    RemoteSubmix,
    Unprocessed,
}

impl AudioSource {
    /// Platform numeric value
    pub fn to_hal(self) -> u32 {
        match self {
            AudioSource::Default => 0,
            AudioSource::Mic => 1,
            AudioSource::VoiceUplink => 2,
            AudioSource::VoiceDownlink => 3,
            AudioSource::VoiceCall => 4,
            AudioSource::Camcorder => 5,
            AudioSource::VoiceRecognition => 6,
            AudioSource::VoiceCommunication => 7,
            AudioSource::RemoteSubmix => 8,
            AudioSource::Unprocessed => 9,
        }
    }
}

/// Playback track description attached to an output stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackTrackMetadata {
    pub usage: u32,
    pub content_type: u32,
    pub gain: f32,
}

/// Metadata of the tracks feeding an output stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMetadata {
    pub tracks: Vec<PlaybackTrackMetadata>,
}

/// Capture track description attached to an input stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordTrackMetadata {
    pub source: AudioSource,
    pub gain: f32,
}

/// Metadata of the tracks consuming an input stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkMetadata {
    pub tracks: Vec<RecordTrackMetadata>,
}

/// Key/value pair of the parameter protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterValue {
    pub key: String,
    pub value: String,
}

impl ParameterValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Direction of a port within a patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRole {
    None,
    Source,
    Sink,
}

/// Endpoint a port config is attached to
#[derive(Debug, Clone, PartialEq)]
pub enum PortEndpoint {
    Device(crate::audio::DeviceAddress),
    Mix { io_handle: i32 },
    Session { session: i32 },
}

/// Gain settings applied to a port
#[derive(Debug, Clone, PartialEq)]
pub struct AudioGainConfig {
    pub index: i32,
    pub mode: u32,
    pub channel_mask: ChannelMask,
    pub values: Vec<i32>,
    pub ramp_duration_ms: u32,
}

/// Negotiated configuration of one audio port
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPortConfig {
    pub id: i32,
    pub role: PortRole,
    pub endpoint: PortEndpoint,
    pub sample_rate: u32,
    pub channel_mask: ChannelMask,
    pub format: AudioFormat,
    pub gain: Option<AudioGainConfig>,
}

/// Format with the rates and masks a port supports for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioProfile {
    pub format: AudioFormat,
    pub sample_rates: Vec<u32>,
    pub channel_masks: Vec<ChannelMask>,
}

/// An audio endpoint as described by the vendor
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPort {
    pub id: i32,
    pub role: PortRole,
    pub name: String,
    pub endpoint: PortEndpoint,
    pub profiles: Vec<AudioProfile>,
    pub active_config: Option<AudioPortConfig>,
}

/// Memory-mapped buffer description, only produced by mmap-capable streams
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MmapBufferInfo {
    pub buffer_size_frames: i32,
    pub burst_size_frames: i32,
}

/// Position inside an mmap buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MmapPosition {
    pub time_nanoseconds: i64,
    pub position_frames: i32,
}

/// Microphone channel mapping role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MicrophoneChannelMapping {
    #[default]
    Unused,
    Direct,
    Processed,
}

/// Physical microphone location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MicrophoneLocation {
    #[default]
    Unknown,
    MainBody,
    MainBodyMovable,
    Peripheral,
}

/// Microphone pickup pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MicrophoneDirectionality {
    #[default]
    Unknown,
    Omni,
    BiDirectional,
    Cardioid,
    HyperCardioid,
    SuperCardioid,
}

/// Point of a microphone frequency response curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyResponsePoint {
    pub frequency: f32,
    pub level: f32,
}

/// 3D coordinate in device space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Static characteristics of one microphone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicrophoneInfo {
    pub device_id: String,
    pub device_address: crate::audio::DeviceAddress,
    pub channel_mapping: Vec<MicrophoneChannelMapping>,
    pub location: MicrophoneLocation,
    pub group: i32,
    pub index_in_the_group: u32,
    pub sensitivity: f32,
    pub max_spl: f32,
    pub min_spl: f32,
    pub directionality: MicrophoneDirectionality,
    pub frequency_response: Vec<FrequencyResponsePoint>,
    pub position: Coordinate,
    pub orientation: Coordinate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_direction() {
        assert!(AudioDevice::IN_BUILTIN_MIC.is_input());
        assert!(!AudioDevice::OUT_SPEAKER.is_input());
        assert_eq!(AudioDevice::IN_BUS.without_direction(), 0x10_0000);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(
            AudioFormat::from_name("AUDIO_FORMAT_PCM_16_BIT"),
            Some(AudioFormat::PCM_16_BIT)
        );
        assert_eq!(AudioFormat::from_name("AUDIO_FORMAT_BOGUS"), None);
        assert_eq!(AudioFormat::PCM_FLOAT.name(), Some("AUDIO_FORMAT_PCM_FLOAT"));
    }

    #[test]
    fn test_channel_count() {
        assert_eq!(ChannelMask::OUT_STEREO.channel_count(), 2);
        assert_eq!(ChannelMask::OUT_5POINT1.channel_count(), 6);
        assert_eq!(ChannelMask::IN_MONO.channel_count(), 1);
    }
}
