//! Audio device adapter
//!
//! Owns the vendor device, opens streams on it and forwards device-level
//! controls. Every vendor status goes through [`status::analyze_status`].
//!
//! Lifecycle: the device is open from construction until [`Device::close`]
//! succeeds (or the last reference drops). Close is refused while streams are
//! open, and the vendor device is closed exactly once.

use super::address::{self, DeviceAddress};
use super::capability;
use super::effects::EffectRegistry;
use super::hw::{
    self, AUDIO_MICROPHONE_MAX_COUNT, HwApiVersion, HwAudioConfig, HwDevice, HwMicrophoneCharacteristic,
    HwStream,
};
use super::parameters::{self, ParametersUtil};
use super::status::{self, AudioError, Result};
use super::stream::{Stream, StreamDirection};
use super::types::{
    AUDIO_PATCH_HANDLE_NONE, AudioConfig, AudioPort, AudioPortConfig, InputFlags, MicrophoneInfo,
    OutputFlags, ParameterValue, SinkMetadata, SourceMetadata,
};
use std::fmt;
use std::os::fd::BorrowedFd;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const CLASS: &str = "Device";

/// Major version of the client-facing interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProtocolVersion {
    /// Single routing device, no parameter context, no microphones
    V2,
    /// Device lists, parameter context, track metadata, microphones
    V4,
}

/// Observable device lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceLifecycle {
    Open,
    Closed,
}

/// Outcome of a stream open
///
/// The vendor may adjust the requested config; the adjusted value is returned
/// whether or not the open succeeded.
#[derive(Debug)]
pub struct OpenedStream {
    pub stream: Result<Stream>,
    pub suggested_config: AudioConfig,
}

struct DeviceInner {
    hw: Box<dyn HwDevice>,
    opened_streams: usize,
    closed: bool,
}

/// State shared between a device and the streams opened on it
pub(crate) struct DeviceCore {
    inner: Mutex<DeviceInner>,
    version: ProtocolVersion,
    api_version: HwApiVersion,
    effects: Arc<EffectRegistry>,
}

impl DeviceCore {
    fn lock(&self) -> MutexGuard<'_, DeviceInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the device, refusing once it is closed
    fn lock_open(&self) -> Result<MutexGuard<'_, DeviceInner>> {
        let inner = self.lock();
        if inner.closed {
            tracing::warn!("Audio device used after close");
            return Err(AudioError::InvalidState);
        }
        Ok(inner)
    }

    pub(crate) fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub(crate) fn effects(&self) -> &EffectRegistry {
        &self.effects
    }

    /// Hand a stream back to the vendor and drop it from the open count
    pub(crate) fn close_stream(&self, direction: StreamDirection, stream: Box<dyn HwStream>) {
        let mut inner = self.lock();
        match direction {
            StreamDirection::Output => inner.hw.close_output_stream(stream),
            StreamDirection::Input => inner.hw.close_input_stream(stream),
        }
        assert!(inner.opened_streams != 0, "opened stream count is already 0");
        inner.opened_streams -= 1;
        tracing::debug!(
            "Closed {:?} stream, {} still open",
            direction,
            inner.opened_streams
        );
    }

    fn close(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.closed || inner.opened_streams != 0 {
            return Err(AudioError::InvalidState);
        }
        inner.closed = true;
        let status = inner.hw.close();
        tracing::info!("Audio device closed");
        status::analyze_status(CLASS, "close", status, &[])
    }
}

impl Drop for DeviceCore {
    fn drop(&mut self) {
        if !self.lock().closed {
            let _ = self.close();
        }
    }
}

/// Audio device adapter
pub struct Device {
    core: Arc<DeviceCore>,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("version", &self.core.version)
            .field("api_version", &self.core.api_version)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

impl Device {
    /// Wrap an opened vendor device
    pub fn new(
        hw: Box<dyn HwDevice>,
        version: ProtocolVersion,
        effects: Arc<EffectRegistry>,
    ) -> Self {
        let api_version = hw.api_version();
        tracing::info!(
            "Audio device up: protocol {:?}, vendor API {}.{}",
            version,
            api_version.major,
            api_version.minor
        );
        Self {
            core: Arc::new(DeviceCore {
                inner: Mutex::new(DeviceInner {
                    hw,
                    opened_streams: 0,
                    closed: false,
                }),
                version,
                api_version,
                effects,
            }),
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.core.version
    }

    pub fn api_version(&self) -> HwApiVersion {
        self.core.api_version
    }

    pub fn lifecycle(&self) -> DeviceLifecycle {
        if self.core.lock().closed {
            DeviceLifecycle::Closed
        } else {
            DeviceLifecycle::Open
        }
    }

    /// Number of streams currently open on this device
    pub fn opened_streams(&self) -> usize {
        self.core.lock().opened_streams
    }

    fn require_version(&self, minimum: ProtocolVersion) -> Result<()> {
        if self.core.version >= minimum {
            Ok(())
        } else {
            Err(AudioError::NotSupported)
        }
    }

    fn require_api(&self, minimum: HwApiVersion) -> Result<()> {
        if self.core.api_version >= minimum {
            Ok(())
        } else {
            Err(AudioError::NotSupported)
        }
    }

    pub fn init_check(&self) -> Result<()> {
        let inner = self.core.lock_open()?;
        status::analyze_status(CLASS, "init_check", inner.hw.init_check(), &[])
    }

    /// Set the master volume, a gain in [0, 1]
    pub fn set_master_volume(&self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            tracing::warn!("Can not set a master volume ({}) outside [0,1]", volume);
            return Err(AudioError::InvalidArguments);
        }
        let mut inner = self.core.lock_open()?;
        let status = inner
            .hw
            .set_master_volume(volume)
            .ok_or(AudioError::NotSupported)?;
        status::analyze_status(CLASS, "set_master_volume", status, &[libc::ENOSYS])
    }

    pub fn master_volume(&self) -> Result<f32> {
        let inner = self.core.lock_open()?;
        let (status, volume) = inner.hw.master_volume().ok_or(AudioError::NotSupported)?;
        status::analyze_status(CLASS, "get_master_volume", status, &[libc::ENOSYS])?;
        Ok(volume)
    }

    pub fn set_mic_mute(&self, mute: bool) -> Result<()> {
        let mut inner = self.core.lock_open()?;
        let status = inner.hw.set_mic_mute(mute);
        status::analyze_status(CLASS, "set_mic_mute", status, &[libc::ENOSYS])
    }

    pub fn mic_mute(&self) -> Result<bool> {
        let inner = self.core.lock_open()?;
        let (status, mute) = inner.hw.mic_mute();
        status::analyze_status(CLASS, "get_mic_mute", status, &[libc::ENOSYS])?;
        Ok(mute)
    }

    pub fn set_master_mute(&self, mute: bool) -> Result<()> {
        let mut inner = self.core.lock_open()?;
        let status = inner
            .hw
            .set_master_mute(mute)
            .ok_or(AudioError::NotSupported)?;
        status::analyze_status(CLASS, "set_master_mute", status, &[libc::ENOSYS])
    }

    pub fn master_mute(&self) -> Result<bool> {
        let inner = self.core.lock_open()?;
        let (status, mute) = inner.hw.master_mute().ok_or(AudioError::NotSupported)?;
        status::analyze_status(CLASS, "get_master_mute", status, &[libc::ENOSYS])?;
        Ok(mute)
    }

    /// Capture buffer size in bytes for a config
    pub fn input_buffer_size(&self, config: &AudioConfig) -> Result<u64> {
        let inner = self.core.lock_open()?;
        match inner.hw.input_buffer_size(&HwAudioConfig::from(config)) {
            0 => Err(AudioError::InvalidArguments),
            size => Ok(size as u64),
        }
    }

    pub fn open_output_stream(
        &self,
        io_handle: i32,
        device: &DeviceAddress,
        config: &AudioConfig,
        flags: OutputFlags,
        source_metadata: &SourceMetadata,
    ) -> OpenedStream {
        let mut hal_config = HwAudioConfig::from(config);
        let address = address::encode(device);
        tracing::debug!(
            "open_output_stream handle: {} devices: {} flags: {:#x} srate: {} format {:#x} channels {:#x} address {}",
            io_handle,
            device.device,
            flags.0,
            hal_config.sample_rate,
            hal_config.format,
            hal_config.channel_mask,
            address
        );

        let opened = match self.core.lock_open() {
            Ok(mut inner) => {
                let opened = inner.hw.open_output_stream(
                    io_handle,
                    device.device.bits(),
                    flags.0,
                    &mut hal_config,
                    &address,
                );
                if opened.is_ok() {
                    inner.opened_streams += 1;
                }
                opened
            }
            Err(e) => {
                return OpenedStream {
                    stream: Err(e),
                    suggested_config: *config,
                };
            }
        };

        let stream = match opened {
            Ok(hw_stream) => {
                let stream = Stream::new(Arc::clone(&self.core), StreamDirection::Output, hw_stream);
                if self.core.version >= ProtocolVersion::V4 {
                    let _ = stream.update_source_metadata(source_metadata);
                }
                Ok(stream)
            }
            Err(status) => Err(open_error("open_output_stream", status)),
        };

        OpenedStream {
            stream,
            suggested_config: suggested_config(&hal_config),
        }
    }

    /// Open a capture stream
    ///
    /// At least one sink track is required; the first track's source is used.
    pub fn open_input_stream(
        &self,
        io_handle: i32,
        device: &DeviceAddress,
        config: &AudioConfig,
        flags: InputFlags,
        sink_metadata: &SinkMetadata,
    ) -> OpenedStream {
        let Some(main_track) = sink_metadata.tracks.first() else {
            tracing::error!("open_input_stream called without tracks connected");
            return OpenedStream {
                stream: Err(AudioError::InvalidArguments),
                suggested_config: AudioConfig::default(),
            };
        };
        let source = main_track.source;

        let mut hal_config = HwAudioConfig::from(config);
        let address = address::encode(device);
        tracing::debug!(
            "open_input_stream handle: {} devices: {} flags: {:#x} srate: {} format {:#x} channels {:#x} address {} source {:?}",
            io_handle,
            device.device,
            flags.0,
            hal_config.sample_rate,
            hal_config.format,
            hal_config.channel_mask,
            address,
            source
        );

        let opened = match self.core.lock_open() {
            Ok(mut inner) => {
                let opened = inner.hw.open_input_stream(
                    io_handle,
                    device.device.bits(),
                    &mut hal_config,
                    flags.0,
                    &address,
                    source.to_hal(),
                );
                if opened.is_ok() {
                    inner.opened_streams += 1;
                }
                opened
            }
            Err(e) => {
                return OpenedStream {
                    stream: Err(e),
                    suggested_config: *config,
                };
            }
        };

        let stream = match opened {
            Ok(hw_stream) => {
                let stream = Stream::new(Arc::clone(&self.core), StreamDirection::Input, hw_stream);
                if self.core.version >= ProtocolVersion::V4 {
                    let _ = stream.update_sink_metadata(sink_metadata);
                }
                Ok(stream)
            }
            Err(status) => Err(open_error("open_input_stream", status)),
        };

        OpenedStream {
            stream,
            suggested_config: suggested_config(&hal_config),
        }
    }

    /// Whether the vendor handles patches and port configs
    pub fn supports_audio_patches(&self) -> bool {
        self.core.api_version >= HwApiVersion::V3_0
    }

    pub fn create_audio_patch(
        &self,
        sources: &[AudioPortConfig],
        sinks: &[AudioPortConfig],
    ) -> Result<i32> {
        let (result, handle) =
            self.create_or_update_audio_patch(AUDIO_PATCH_HANDLE_NONE, sources, sinks);
        result.map(|()| handle)
    }

    /// Reconfigure an existing patch
    pub fn update_audio_patch(
        &self,
        previous: i32,
        sources: &[AudioPortConfig],
        sinks: &[AudioPortConfig],
    ) -> Result<i32> {
        self.require_version(ProtocolVersion::V4)?;
        if previous == AUDIO_PATCH_HANDLE_NONE {
            return Err(AudioError::InvalidArguments);
        }
        let (result, handle) = self.create_or_update_audio_patch(previous, sources, sinks);
        result.map(|()| handle)
    }

    /// Create a patch when `handle` is none, otherwise update it in place.
    ///
    /// The returned handle is the vendor's on success and `handle` unchanged
    /// on failure.
    pub fn create_or_update_audio_patch(
        &self,
        handle: i32,
        sources: &[AudioPortConfig],
        sinks: &[AudioPortConfig],
    ) -> (Result<()>, i32) {
        match self.patch_call(handle, sources, sinks) {
            Ok(patched) => (Ok(()), patched),
            Err(e) => (Err(e), handle),
        }
    }

    fn patch_call(
        &self,
        handle: i32,
        sources: &[AudioPortConfig],
        sinks: &[AudioPortConfig],
    ) -> Result<i32> {
        self.require_api(HwApiVersion::V3_0)?;
        let hal_sources = port_configs_to_hal(sources)?;
        let hal_sinks = port_configs_to_hal(sinks)?;

        let mut inner = self.core.lock_open()?;
        let mut hal_handle = handle;
        let status = inner
            .hw
            .create_audio_patch(&hal_sources, &hal_sinks, &mut hal_handle)
            .ok_or(AudioError::NotSupported)?;
        status::analyze_status(CLASS, "create_audio_patch", status, &[])?;
        tracing::debug!("Audio patch {} -> {}", handle, hal_handle);
        Ok(hal_handle)
    }

    pub fn release_audio_patch(&self, handle: i32) -> Result<()> {
        self.require_api(HwApiVersion::V3_0)?;
        let mut inner = self.core.lock_open()?;
        let status = inner
            .hw
            .release_audio_patch(handle)
            .ok_or(AudioError::NotSupported)?;
        status::analyze_status(CLASS, "release_audio_patch", status, &[])
    }

    /// Ask the vendor to fill in a port description
    pub fn audio_port(&self, port: &AudioPort) -> Result<AudioPort> {
        self.require_api(HwApiVersion::V3_0)?;
        let mut hal_port = hw::port_to_hal(port);
        let inner = self.core.lock_open()?;
        let status = inner
            .hw
            .get_audio_port(&mut hal_port)
            .ok_or(AudioError::NotSupported)?;
        status::analyze_status(CLASS, "get_audio_port", status, &[])?;
        Ok(hw::port_from_hal(&hal_port))
    }

    pub fn set_audio_port_config(&self, config: &AudioPortConfig) -> Result<()> {
        self.require_api(HwApiVersion::V3_0)?;
        let hal_config = hw::port_config_to_hal(config).ok_or(AudioError::InvalidArguments)?;
        let mut inner = self.core.lock_open()?;
        let status = inner
            .hw
            .set_audio_port_config(&hal_config)
            .ok_or(AudioError::NotSupported)?;
        status::analyze_status(CLASS, "set_audio_port_config", status, &[])
    }

    pub fn hw_av_sync(&self) -> Result<i32> {
        let value = self.param_int(parameters::KEY_HW_AV_SYNC)?;
        i32::try_from(value).map_err(|_| AudioError::InvalidState)
    }

    pub fn set_screen_state(&self, turned_on: bool) -> Result<()> {
        self.set_param_bool(parameters::KEY_SCREEN_STATE, turned_on)
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
        match self.core.version {
            ProtocolVersion::V2 => &[],
            ProtocolVersion::V4 => context,
        }
    }

    /// Static characteristics of every microphone
    ///
    /// Either all entries convert or the whole call fails.
    pub fn microphones(&self) -> Result<Vec<MicrophoneInfo>> {
        self.require_version(ProtocolVersion::V4)?;

        let mut mics = vec![HwMicrophoneCharacteristic::default(); AUDIO_MICROPHONE_MAX_COUNT];
        let mut count = AUDIO_MICROPHONE_MAX_COUNT;
        let status = {
            let inner = self.core.lock_open()?;
            inner
                .hw
                .get_microphones(&mut mics, &mut count)
                .ok_or(AudioError::NotSupported)?
        };
        if status != 0 {
            tracing::debug!("get_microphones failed with status {}", status);
            return Err(AudioError::NotSupported);
        }
        if count > AUDIO_MICROPHONE_MAX_COUNT {
            tracing::warn!("Vendor reported {} microphones, capacity is {}", count, AUDIO_MICROPHONE_MAX_COUNT);
            return Err(AudioError::NotSupported);
        }

        mics[..count]
            .iter()
            .map(capability::microphone_from_hal)
            .collect::<Option<Vec<_>>>()
            .ok_or(AudioError::NotSupported)
    }

    /// Report a device hot-plug event
    pub fn set_connected_state(&self, address: &DeviceAddress, connected: bool) -> Result<()> {
        self.require_version(ProtocolVersion::V4)?;
        let key = if connected {
            parameters::KEY_DEVICE_CONNECT
        } else {
            parameters::KEY_DEVICE_DISCONNECT
        };
        self.set_param_address(key, address)
    }

    pub fn add_device_effect(&self, port: i32, effect_id: u64) -> Result<()> {
        self.require_api(HwApiVersion::V3_1)?;
        let effect = self.core.effects.get(effect_id).ok_or_else(|| {
            tracing::warn!("Invalid effect ID passed from client: {}", effect_id);
            AudioError::InvalidArguments
        })?;
        let mut inner = self.core.lock_open()?;
        let status = inner
            .hw
            .add_device_effect(port, effect)
            .ok_or(AudioError::NotSupported)?;
        status::analyze_status(CLASS, "add_device_effect", status, &[])
    }

    pub fn remove_device_effect(&self, port: i32, effect_id: u64) -> Result<()> {
        self.require_api(HwApiVersion::V3_1)?;
        let effect = self.core.effects.get(effect_id).ok_or_else(|| {
            tracing::warn!("Invalid effect ID passed from client: {}", effect_id);
            AudioError::InvalidArguments
        })?;
        let mut inner = self.core.lock_open()?;
        let status = inner
            .hw
            .remove_device_effect(port, effect)
            .ok_or(AudioError::NotSupported)?;
        status::analyze_status(CLASS, "remove_device_effect", status, &[])
    }

    /// Dump vendor state; ignored unless exactly one descriptor is given
    pub fn debug(&self, fds: &[BorrowedFd<'_>]) {
        let [fd] = fds else {
            return;
        };
        if let Ok(inner) = self.core.lock_open() {
            let _ = status::analyze_status(CLASS, "dump", inner.hw.dump(*fd), &[]);
        }
    }

    /// Close the vendor device
    ///
    /// Fails with InvalidState while streams are open or when already closed.
    pub fn close(&self) -> Result<()> {
        self.core.close()
    }
}

impl ParametersUtil for Device {
    fn class_name(&self) -> &'static str {
        CLASS
    }

    fn hal_get_parameters(&self, keys: &str) -> Option<String> {
        self.core.lock_open().ok()?.hw.get_parameters(keys)
    }

    fn hal_set_parameters(&self, key_values: &str) -> hw::Status {
        match self.core.lock_open() {
            Ok(mut inner) => inner.hw.set_parameters(key_values),
            Err(_) => -libc::ENODEV,
        }
    }
}

fn port_configs_to_hal(configs: &[AudioPortConfig]) -> Result<Vec<hw::HwPortConfig>> {
    configs
        .iter()
        .map(|c| {
            hw::port_config_to_hal(c).ok_or_else(|| {
                tracing::warn!("Port config {} has too many gain values", c.id);
                AudioError::InvalidArguments
            })
        })
        .collect()
}

/// Stream open failure. EINVAL means the vendor rejected the config and
/// suggested another one, which is a normal negotiation outcome.
fn open_error(func: &str, status: hw::Status) -> AudioError {
    if status == -libc::EINVAL {
        tracing::debug!("{} rejected the requested config", func);
        return AudioError::InvalidArguments;
    }
    match status::analyze_status(CLASS, func, status, &[]) {
        Err(e) => e,
        Ok(()) => AudioError::Unknown(status),
    }
}

fn suggested_config(hal_config: &HwAudioConfig) -> AudioConfig {
    hal_config.to_config().unwrap_or_else(|config| {
        tracing::warn!("Suggested config with incompatible fields: {:?}", config);
        config
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockAudioHw, MockAudioState, MockAudioStream};
    use std::sync::RwLock;
    use crate::audio::types::{AudioDevice, RecordTrackMetadata, AudioSource};

    fn device(version: ProtocolVersion) -> (Device, Arc<RwLock<MockAudioState>>) {
        let hw = MockAudioHw::new(HwApiVersion::V3_0);
        let state = hw.state();
        (
            Device::new(Box::new(hw), version, Arc::new(EffectRegistry::new())),
            state,
        )
    }

    #[test]
    fn test_master_volume_range() {
        let (device, state) = device(ProtocolVersion::V4);
        assert_eq!(device.set_master_volume(-0.1), Err(AudioError::InvalidArguments));
        assert_eq!(device.set_master_volume(1.1), Err(AudioError::InvalidArguments));
        assert_eq!(device.set_master_volume(f32::NAN), Err(AudioError::InvalidArguments));
        assert_eq!(state.read().unwrap().calls("set_master_volume"), 0);

        assert_eq!(device.set_master_volume(0.5), Ok(()));
        assert_eq!(state.read().unwrap().calls("set_master_volume"), 1);
        assert_eq!(device.master_volume(), Ok(0.5));
    }

    #[test]
    fn test_close_twice() {
        let (device, state) = device(ProtocolVersion::V4);
        assert_eq!(device.close(), Ok(()));
        assert_eq!(device.lifecycle(), DeviceLifecycle::Closed);
        assert_eq!(device.close(), Err(AudioError::InvalidState));
        assert_eq!(state.read().unwrap().calls("close"), 1);
    }

    #[test]
    fn test_drop_closes_once() {
        let (device, state) = device(ProtocolVersion::V4);
        drop(device);
        assert_eq!(state.read().unwrap().calls("close"), 1);
    }

    #[test]
    fn test_input_without_tracks() {
        let (device, state) = device(ProtocolVersion::V4);
        let opened = device.open_input_stream(
            1,
            &DeviceAddress::new(AudioDevice::IN_BUILTIN_MIC),
            &AudioConfig::default(),
            InputFlags::NONE,
            &SinkMetadata::default(),
        );
        assert_eq!(opened.stream.unwrap_err(), AudioError::InvalidArguments);
        assert_eq!(device.opened_streams(), 0);
        assert_eq!(state.read().unwrap().calls("open_input_stream"), 0);
    }

    #[test]
    fn test_input_uses_first_track_source() {
        let (device, state) = device(ProtocolVersion::V4);
        let metadata = SinkMetadata {
            tracks: vec![
                RecordTrackMetadata { source: AudioSource::Camcorder, gain: 1.0 },
                RecordTrackMetadata { source: AudioSource::Mic, gain: 1.0 },
            ],
        };
        let opened = device.open_input_stream(
            1,
            &DeviceAddress::new(AudioDevice::IN_BUILTIN_MIC),
            &AudioConfig::default(),
            InputFlags::NONE,
            &metadata,
        );
        let stream = opened.stream.unwrap();
        assert_eq!(state.read().unwrap().last_input_source, Some(AudioSource::Camcorder.to_hal()));
        assert_eq!(device.opened_streams(), 1);
        drop(stream);
        assert_eq!(device.opened_streams(), 0);
    }

    #[test]
    fn test_patch_needs_api_3() {
        let hw = MockAudioHw::new(HwApiVersion::V2_0);
        let state = hw.state();
        let device = Device::new(Box::new(hw), ProtocolVersion::V4, Arc::new(EffectRegistry::new()));
        assert!(!device.supports_audio_patches());
        assert_eq!(device.create_audio_patch(&[], &[]), Err(AudioError::NotSupported));
        assert_eq!(device.release_audio_patch(3), Err(AudioError::NotSupported));
        assert_eq!(state.read().unwrap().calls("create_audio_patch"), 0);
    }

    #[test]
    fn test_update_rejects_none_handle() {
        let (device, _) = device(ProtocolVersion::V4);
        assert_eq!(
            device.update_audio_patch(AUDIO_PATCH_HANDLE_NONE, &[], &[]),
            Err(AudioError::InvalidArguments)
        );
    }

    #[test]
    fn test_update_none_handle_before_api_check() {
        let hw = MockAudioHw::new(HwApiVersion::V2_0);
        let device = Device::new(Box::new(hw), ProtocolVersion::V4, Arc::new(EffectRegistry::new()));
        assert_eq!(
            device.update_audio_patch(AUDIO_PATCH_HANDLE_NONE, &[], &[]),
            Err(AudioError::InvalidArguments)
        );
        assert_eq!(device.update_audio_patch(7, &[], &[]), Err(AudioError::NotSupported));
    }

    #[test]
    fn test_update_patch_needs_v4() {
        let (device, state) = device(ProtocolVersion::V2);
        assert_eq!(device.update_audio_patch(1, &[], &[]), Err(AudioError::NotSupported));
        assert_eq!(
            device.update_audio_patch(AUDIO_PATCH_HANDLE_NONE, &[], &[]),
            Err(AudioError::NotSupported)
        );
        assert_eq!(state.read().unwrap().calls("create_audio_patch"), 0);
    }

    #[test]
    fn test_failed_patch_keeps_handle() {
        let (device, _) = device(ProtocolVersion::V4);
        let (result, handle) = device.create_or_update_audio_patch(42, &[], &[]);
        assert_eq!(result, Err(AudioError::InvalidArguments));
        assert_eq!(handle, 42);

        let (result, handle) = device.create_or_update_audio_patch(AUDIO_PATCH_HANDLE_NONE, &[], &[]);
        assert_eq!(result, Ok(()));
        assert_ne!(handle, AUDIO_PATCH_HANDLE_NONE);
    }

    #[test]
    fn test_v2_has_no_microphones() {
        let (device, _) = device(ProtocolVersion::V2);
        assert_eq!(device.microphones(), Err(AudioError::NotSupported));
        assert_eq!(
            device.set_connected_state(&DeviceAddress::new(AudioDevice::OUT_SPEAKER), true),
            Err(AudioError::NotSupported)
        );
    }

    #[test]
    #[should_panic(expected = "opened stream count is already 0")]
    fn test_double_decrement_is_fatal() {
        let (device, state) = device(ProtocolVersion::V4);
        let stream = Box::new(MockAudioStream::new(state));
        device.core.close_stream(StreamDirection::Output, stream);
    }
}
