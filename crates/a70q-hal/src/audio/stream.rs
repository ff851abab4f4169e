//! Audio stream adapter
//!
//! A [`Stream`] wraps one vendor stream opened by a [`super::Device`]. Most
//! stream settings travel over the keyed parameter protocol; the vendor only
//! has dedicated entries for the basic properties, standby, effects and dump.
//!
//! Dropping a stream hands the vendor stream back to its device, which closes
//! it and decrements the open-stream count.

use super::address::DeviceAddress;
use super::device::{DeviceCore, ProtocolVersion};
use super::effects::EffectHandle;
use super::hw::{HwStream, Status};
use super::parameters::{self, AudioParameter, ParametersUtil};
use super::status::{self, AudioError, Result};
use super::types::{
    AudioConfig, AudioDevice, AudioFormat, ChannelMask, MmapBufferInfo, MmapPosition,
    ParameterValue, SinkMetadata, SourceMetadata,
};
use std::fmt;
use std::os::fd::BorrowedFd;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const CLASS: &str = "Stream";

/// Data direction of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDirection {
    Output,
    Input,
}

/// Audio stream adapter
pub struct Stream {
    device: Arc<DeviceCore>,
    direction: StreamDirection,
    version: ProtocolVersion,
    /// Taken on drop
    hw: Mutex<Option<Box<dyn HwStream>>>,
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("direction", &self.direction)
            .field("version", &self.version)
            .finish()
    }
}

impl Stream {
    pub(crate) fn new(
        device: Arc<DeviceCore>,
        direction: StreamDirection,
        hw: Box<dyn HwStream>,
    ) -> Self {
        let version = device.version();
        Self {
            device,
            direction,
            version,
            hw: Mutex::new(Some(hw)),
        }
    }

    pub fn direction(&self) -> StreamDirection {
        self.direction
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn HwStream>>> {
        self.hw.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_hw<T>(&self, f: impl FnOnce(&mut dyn HwStream) -> Result<T>) -> Result<T> {
        let mut guard = self.lock();
        let hw = guard.as_deref_mut().ok_or(AudioError::InvalidState)?;
        f(hw)
    }

    fn require_version(&self, version: ProtocolVersion) -> Result<()> {
        if self.version == version {
            Ok(())
        } else {
            Err(AudioError::NotSupported)
        }
    }

    pub fn sample_rate(&self) -> Result<u32> {
        self.with_hw(|hw| Ok(hw.sample_rate()))
    }

    pub fn channel_mask(&self) -> Result<ChannelMask> {
        self.with_hw(|hw| Ok(ChannelMask(hw.channels())))
    }

    pub fn format(&self) -> Result<AudioFormat> {
        self.with_hw(|hw| Ok(AudioFormat(hw.format())))
    }

    /// Sample rate, channel mask and format in one call
    pub fn audio_properties(&self) -> Result<AudioConfig> {
        self.with_hw(|hw| {
            Ok(AudioConfig {
                sample_rate: hw.sample_rate(),
                channel_mask: ChannelMask(hw.channels()),
                format: AudioFormat(hw.format()),
                frame_count: 0,
            })
        })
    }

    /// Buffer size in bytes
    pub fn buffer_size(&self) -> Result<u64> {
        self.with_hw(|hw| Ok(hw.buffer_size() as u64))
    }

    pub fn frame_count(&self) -> Result<u64> {
        let count = self.param_int(parameters::KEY_FRAME_COUNT)?;
        u64::try_from(count).map_err(|_| AudioError::InvalidState)
    }

    /// Bytes per frame; compressed formats count as one byte
    pub fn frame_size(&self) -> Result<u64> {
        let config = self.audio_properties()?;
        Ok(match config.format.bytes_per_sample() {
            Some(bytes) => bytes as u64 * u64::from(config.channel_mask.channel_count()),
            None => 1,
        })
    }

    pub fn set_sample_rate(&self, sample_rate: u32) -> Result<()> {
        self.set_param_int(parameters::KEY_SAMPLING_RATE, i64::from(sample_rate))
    }

    pub fn set_channel_mask(&self, mask: ChannelMask) -> Result<()> {
        self.set_param_int(parameters::KEY_CHANNELS, i64::from(mask.0))
    }

    pub fn set_format(&self, format: AudioFormat) -> Result<()> {
        self.set_param_int(parameters::KEY_FORMAT, i64::from(format.0))
    }

    /// Propose a sample rate and return what the hardware settled on
    pub fn negotiate_sample_rate(&self, sample_rate: u32) -> Result<u32> {
        self.set_sample_rate(sample_rate)?;
        self.sample_rate()
    }

    pub fn negotiate_channel_mask(&self, mask: ChannelMask) -> Result<ChannelMask> {
        self.set_channel_mask(mask)?;
        self.channel_mask()
    }

    pub fn negotiate_format(&self, format: AudioFormat) -> Result<AudioFormat> {
        self.set_format(format)?;
        self.format()
    }

    /// Sample rates the stream can run at for `format`
    pub fn supported_sample_rates(&self, format: AudioFormat) -> Result<Vec<u32>> {
        let values = self.supported_values(
            parameters::KEY_STREAM_SUPPORTED_SAMPLING_RATES,
            Some(format),
        )?;
        let mut rates: Vec<u32> = values
            .iter()
            .filter_map(|v| match v.parse() {
                Ok(rate) => Some(rate),
                Err(_) => {
                    tracing::warn!("Ignoring malformed sample rate {:?}", v);
                    None
                }
            })
            .collect();
        rates.sort_unstable();
        rates.dedup();
        non_empty(rates)
    }

    pub fn supported_channel_masks(&self, format: AudioFormat) -> Result<Vec<ChannelMask>> {
        let values =
            self.supported_values(parameters::KEY_STREAM_SUPPORTED_CHANNELS, Some(format))?;
        let mut masks: Vec<ChannelMask> = values
            .iter()
            .filter_map(|v| {
                let mask = ChannelMask::from_name(v);
                if mask.is_none() {
                    tracing::warn!("Ignoring unknown channel mask {:?}", v);
                }
                mask
            })
            .collect();
        masks.sort_unstable();
        masks.dedup();
        non_empty(masks)
    }

    pub fn supported_formats(&self) -> Result<Vec<AudioFormat>> {
        let values = self.supported_values(parameters::KEY_STREAM_SUPPORTED_FORMATS, None)?;
        let mut formats: Vec<AudioFormat> = Vec::new();
        for value in &values {
            match AudioFormat::from_name(value) {
                Some(format) if !formats.contains(&format) => formats.push(format),
                Some(_) => {}
                None => tracing::warn!("Ignoring unknown format {:?}", value),
            }
        }
        non_empty(formats)
    }

    /// Raw `|`-separated list behind a capability key
    fn supported_values(&self, key: &str, format: Option<AudioFormat>) -> Result<Vec<String>> {
        let mut context = AudioParameter::new();
        if let Some(format) = format {
            context.add_int(parameters::KEY_FORMAT, i64::from(format.0));
        }
        let list = self.param_str(key, &context)?;
        Ok(list
            .split(parameters::VALUE_LIST_SEPARATOR)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect())
    }

    pub fn add_effect(&self, effect_id: u64) -> Result<()> {
        let effect = self.lookup_effect(effect_id)?;
        self.with_hw(|hw| {
            status::analyze_status(CLASS, "add_audio_effect", hw.add_audio_effect(effect), &[])
        })
    }

    pub fn remove_effect(&self, effect_id: u64) -> Result<()> {
        let effect = self.lookup_effect(effect_id)?;
        self.with_hw(|hw| {
            status::analyze_status(
                CLASS,
                "remove_audio_effect",
                hw.remove_audio_effect(effect),
                &[],
            )
        })
    }

    fn lookup_effect(&self, effect_id: u64) -> Result<EffectHandle> {
        self.device.effects().get(effect_id).ok_or_else(|| {
            tracing::warn!("Invalid effect ID passed from client: {}", effect_id);
            AudioError::InvalidArguments
        })
    }

    pub fn standby(&self) -> Result<()> {
        self.with_hw(|hw| status::analyze_status(CLASS, "standby", hw.standby(), &[]))
    }

    pub fn set_hw_av_sync(&self, hw_av_sync: u32) -> Result<()> {
        self.set_param_int(parameters::KEY_STREAM_HW_AV_SYNC, i64::from(hw_av_sync))
    }

    /// Current routing device (V2)
    pub fn device(&self) -> Result<AudioDevice> {
        self.require_version(ProtocolVersion::V2)?;
        self.routed_device()
    }

    /// Route to a single device (V2)
    pub fn set_device(&self, address: &DeviceAddress) -> Result<()> {
        self.require_version(ProtocolVersion::V2)?;
        self.set_param_address(parameters::KEY_ROUTING, address)
    }

    /// Report a device connected to or disconnected from this stream (V2)
    pub fn set_connected_state(&self, address: &DeviceAddress, connected: bool) -> Result<()> {
        self.require_version(ProtocolVersion::V2)?;
        let key = if connected {
            parameters::KEY_STREAM_CONNECT
        } else {
            parameters::KEY_STREAM_DISCONNECT
        };
        self.set_param_address(key, address)
    }

    /// Current routing devices (V4); holds a single entry
    pub fn devices(&self) -> Result<Vec<DeviceAddress>> {
        self.require_version(ProtocolVersion::V4)?;
        Ok(vec![DeviceAddress::new(self.routed_device()?)])
    }

    /// Route to a device list (V4)
    ///
    /// Only one device at a time is supported; an empty list routes to none.
    pub fn set_devices(&self, devices: &[DeviceAddress]) -> Result<()> {
        self.require_version(ProtocolVersion::V4)?;
        match devices {
            [] => self.set_param_address(
                parameters::KEY_ROUTING,
                &DeviceAddress::new(AudioDevice::NONE),
            ),
            [address] => self.set_param_address(parameters::KEY_ROUTING, address),
            _ => Err(AudioError::NotSupported),
        }
    }

    fn routed_device(&self) -> Result<AudioDevice> {
        let device = self.param_int(parameters::KEY_ROUTING)?;
        u32::try_from(device)
            .map(AudioDevice)
            .map_err(|_| AudioError::NotSupported)
    }

    /// Query parameters; `context` is only forwarded by the V4 protocol
    pub fn parameters(
        &self,
        context: &[ParameterValue],
        keys: &[String],
    ) -> (Result<()>, Vec<ParameterValue>) {
        self.parameters_impl(self.effective_context(context), keys)
    }

    /// Set parameters; `context` is only forwarded by the V4 protocol
    pub fn set_parameters(
        &self,
        context: &[ParameterValue],
        parameters: &[ParameterValue],
    ) -> Result<()> {
        self.set_parameters_impl(self.effective_context(context), parameters)
    }

    fn effective_context<'a>(&self, context: &'a [ParameterValue]) -> &'a [ParameterValue] {
        match self.version {
            ProtocolVersion::V2 => &[],
            ProtocolVersion::V4 => context,
        }
    }

    /// Describe the playback tracks feeding this stream (V4)
    pub fn update_source_metadata(&self, metadata: &SourceMetadata) -> Result<()> {
        self.require_version(ProtocolVersion::V4)?;
        self.with_hw(|hw| {
            hw.update_source_metadata(metadata)
                .ok_or(AudioError::NotSupported)
        })
    }

    /// Describe the capture tracks consuming this stream (V4)
    pub fn update_sink_metadata(&self, metadata: &SinkMetadata) -> Result<()> {
        self.require_version(ProtocolVersion::V4)?;
        self.with_hw(|hw| {
            hw.update_sink_metadata(metadata)
                .ok_or(AudioError::NotSupported)
        })
    }

    pub fn start(&self) -> Result<()> {
        Err(AudioError::NotSupported)
    }

    pub fn stop(&self) -> Result<()> {
        Err(AudioError::NotSupported)
    }

    pub fn create_mmap_buffer(&self, _min_size_frames: i32) -> Result<MmapBufferInfo> {
        Err(AudioError::NotSupported)
    }

    pub fn mmap_position(&self) -> Result<MmapPosition> {
        Err(AudioError::NotSupported)
    }

    /// Streams are closed by dropping them
    pub fn close(&self) -> Result<()> {
        Err(AudioError::NotSupported)
    }

    /// Dump vendor state; ignored unless exactly one descriptor is given
    pub fn debug(&self, fds: &[BorrowedFd<'_>]) {
        let [fd] = fds else {
            return;
        };
        let _ = self.with_hw(|hw| status::analyze_status(CLASS, "dump", hw.dump(*fd), &[]));
    }
}

impl ParametersUtil for Stream {
    fn class_name(&self) -> &'static str {
        CLASS
    }

    fn hal_get_parameters(&self, keys: &str) -> Option<String> {
        self.lock().as_ref()?.get_parameters(keys)
    }

    fn hal_set_parameters(&self, key_values: &str) -> Status {
        match self.lock().as_mut() {
            Some(hw) => hw.set_parameters(key_values),
            None => -libc::ENODEV,
        }
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        let hw = self
            .hw
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(hw) = hw {
            self.device.close_stream(self.direction, hw);
        }
    }
}

fn non_empty<T>(values: Vec<T>) -> Result<Vec<T>> {
    if values.is_empty() {
        Err(AudioError::NotSupported)
    } else {
        Ok(values)
    }
}
