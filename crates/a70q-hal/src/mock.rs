//! Mock vendor audio library for testing without real hardware
//!
//! [`MockAudioHw`] implements the vendor device table on top of a shared
//! [`MockAudioState`], so tests can inspect which entry points were hit and
//! steer vendor behavior (failing opens, suggested configs, microphones).
//!
//! # Usage
//!
//! ```no_run
//! use a70q_hal::audio::hw::HwApiVersion;
//! use a70q_hal::mock::MockAudioHw;
//!
//! // Vendor library with patch support but no optional volume entries
//! let hw = MockAudioHw::new(HwApiVersion::V3_0).without_optional_entries();
//! let state = hw.state();
//! state.write().unwrap().open_status = -libc::EINVAL;
//! ```

use crate::audio::effects::EffectHandle;
use crate::audio::hw::{
    HwApiVersion, HwAudioConfig, HwAudioPort, HwDevice, HwMicrophoneCharacteristic, HwPortConfig,
    HwStream, Status,
};
use crate::audio::parameters::{self, AudioParameter};
use crate::audio::types::{
    AUDIO_PATCH_HANDLE_NONE, AudioFormat, ChannelMask, SinkMetadata, SourceMetadata,
};
use std::collections::{BTreeMap, HashMap};
use std::os::fd::BorrowedFd;
use std::sync::{Arc, RwLock};

const MOCK_FRAME_COUNT: u64 = 960;

/// Shared state behind a mock device and its streams
#[derive(Debug, Clone)]
pub struct MockAudioState {
    calls: HashMap<&'static str, usize>,
    pub init_status: Status,
    pub master_volume: f32,
    pub master_mute: bool,
    pub mic_mute: bool,
    pub parameters: BTreeMap<String, String>,
    /// Status returned by stream opens; zero succeeds
    pub open_status: Status,
    /// Config the vendor substitutes on open
    pub suggested_config: Option<HwAudioConfig>,
    pub last_input_source: Option<u32>,
    /// Highest sample rate streams accept
    pub stream_rate_cap: Option<u32>,
    pub open_streams: usize,
    pub next_patch: i32,
    pub patches: BTreeMap<i32, (Vec<HwPortConfig>, Vec<HwPortConfig>)>,
    pub port_configs: Vec<HwPortConfig>,
    pub microphones: Vec<HwMicrophoneCharacteristic>,
    /// Count reported by `get_microphones` instead of the real one
    pub reported_microphones: Option<usize>,
    pub device_effects: Vec<(i32, EffectHandle)>,
    pub stream_effects: Vec<EffectHandle>,
    pub source_metadata: Option<SourceMetadata>,
    pub sink_metadata: Option<SinkMetadata>,
    pub dumps: usize,
}

impl MockAudioState {
    pub fn new() -> Self {
        Self {
            calls: HashMap::new(),
            init_status: 0,
            master_volume: 1.0,
            master_mute: false,
            mic_mute: false,
            parameters: BTreeMap::new(),
            open_status: 0,
            suggested_config: None,
            last_input_source: None,
            stream_rate_cap: None,
            open_streams: 0,
            next_patch: 0,
            patches: BTreeMap::new(),
            port_configs: Vec::new(),
            microphones: Vec::new(),
            reported_microphones: None,
            device_effects: Vec::new(),
            stream_effects: Vec::new(),
            source_metadata: None,
            sink_metadata: None,
            dumps: 0,
        }
    }

    /// How many times a vendor entry point was called
    pub fn calls(&self, entry: &str) -> usize {
        self.calls.get(entry).copied().unwrap_or(0)
    }

    fn record(&mut self, entry: &'static str) {
        *self.calls.entry(entry).or_insert(0) += 1;
    }
}

impl Default for MockAudioState {
    fn default() -> Self {
        Self::new()
    }
}

fn answer(store: &BTreeMap<String, String>, keys: &str) -> String {
    let mut reply = AudioParameter::new();
    for (key, _) in AudioParameter::parse(keys).iter() {
        if let Some(value) = store.get(key) {
            reply.add(key, value);
        }
    }
    reply.to_string()
}

/// Mock vendor audio device
pub struct MockAudioHw {
    api_version: HwApiVersion,
    optional_entries: bool,
    state: Arc<RwLock<MockAudioState>>,
}

impl MockAudioHw {
    pub fn new(api_version: HwApiVersion) -> Self {
        Self {
            api_version,
            optional_entries: true,
            state: Arc::new(RwLock::new(MockAudioState::new())),
        }
    }

    /// Drop every optional entry point from the table
    pub fn without_optional_entries(mut self) -> Self {
        self.optional_entries = false;
        self
    }

    /// Get shared state for testing
    pub fn state(&self) -> Arc<RwLock<MockAudioState>> {
        Arc::clone(&self.state)
    }

    fn record(&self, entry: &'static str) {
        if let Ok(mut state) = self.state.write() {
            state.record(entry);
        }
    }

    /// Record an optional entry point call, `None` when the table lacks it
    fn optional(&self, entry: &'static str) -> Option<()> {
        if !self.optional_entries {
            return None;
        }
        self.record(entry);
        Some(())
    }

    fn open_stream(
        &mut self,
        entry: &'static str,
        devices: u32,
        config: &mut HwAudioConfig,
    ) -> Result<Box<dyn HwStream>, Status> {
        self.record(entry);
        let Ok(mut state) = self.state.write() else {
            return Err(-libc::EIO);
        };
        if let Some(suggested) = state.suggested_config {
            *config = suggested;
        }
        if state.open_status != 0 {
            return Err(state.open_status);
        }
        state.open_streams += 1;
        drop(state);
        Ok(Box::new(MockAudioStream::with_config(
            Arc::clone(&self.state),
            *config,
            devices,
        )))
    }

    fn close_stream(&mut self, entry: &'static str) {
        self.record(entry);
        if let Ok(mut state) = self.state.write() {
            state.open_streams = state.open_streams.saturating_sub(1);
        }
    }
}

impl HwDevice for MockAudioHw {
    fn api_version(&self) -> HwApiVersion {
        self.api_version
    }

    fn init_check(&self) -> Status {
        self.record("init_check");
        self.state.read().map(|s| s.init_status).unwrap_or(-libc::EIO)
    }

    fn set_mic_mute(&mut self, mute: bool) -> Status {
        self.record("set_mic_mute");
        if let Ok(mut state) = self.state.write() {
            state.mic_mute = mute;
        }
        0
    }

    fn mic_mute(&self) -> (Status, bool) {
        self.record("get_mic_mute");
        (0, self.state.read().map(|s| s.mic_mute).unwrap_or(false))
    }

    fn input_buffer_size(&self, config: &HwAudioConfig) -> usize {
        self.record("get_input_buffer_size");
        let Some(bytes) = AudioFormat(config.format).bytes_per_sample() else {
            return 0;
        };
        let channels = ChannelMask(config.channel_mask).channel_count() as usize;
        // 20 ms of audio
        config.sample_rate as usize / 50 * channels * bytes
    }

    fn open_output_stream(
        &mut self,
        _io_handle: i32,
        devices: u32,
        _flags: u32,
        config: &mut HwAudioConfig,
        _address: &str,
    ) -> Result<Box<dyn HwStream>, Status> {
        self.open_stream("open_output_stream", devices, config)
    }

    fn open_input_stream(
        &mut self,
        _io_handle: i32,
        devices: u32,
        config: &mut HwAudioConfig,
        _flags: u32,
        _address: &str,
        source: u32,
    ) -> Result<Box<dyn HwStream>, Status> {
        if let Ok(mut state) = self.state.write() {
            state.last_input_source = Some(source);
        }
        self.open_stream("open_input_stream", devices, config)
    }

    fn close_output_stream(&mut self, _stream: Box<dyn HwStream>) {
        self.close_stream("close_output_stream");
    }

    fn close_input_stream(&mut self, _stream: Box<dyn HwStream>) {
        self.close_stream("close_input_stream");
    }

    fn get_parameters(&self, keys: &str) -> Option<String> {
        self.record("get_parameters");
        let state = self.state.read().ok()?;
        Some(answer(&state.parameters, keys))
    }

    fn set_parameters(&mut self, key_values: &str) -> Status {
        self.record("set_parameters");
        let Ok(mut state) = self.state.write() else {
            return -libc::EIO;
        };
        for (key, value) in AudioParameter::parse(key_values).iter() {
            state.parameters.insert(key.to_string(), value.to_string());
        }
        0
    }

    fn dump(&self, fd: BorrowedFd<'_>) -> Status {
        self.record("dump");
        if let Ok(mut state) = self.state.write() {
            state.dumps += 1;
        }
        match nix::unistd::write(fd, b"mock audio device\n") {
            Ok(_) => 0,
            Err(errno) => -(errno as i32),
        }
    }

    fn close(&mut self) -> Status {
        self.record("close");
        0
    }

    fn set_master_volume(&mut self, volume: f32) -> Option<Status> {
        self.optional("set_master_volume")?;
        if let Ok(mut state) = self.state.write() {
            state.master_volume = volume;
        }
        Some(0)
    }

    fn master_volume(&self) -> Option<(Status, f32)> {
        self.optional("get_master_volume")?;
        let volume = self.state.read().map(|s| s.master_volume).unwrap_or(0.0);
        Some((0, volume))
    }

    fn set_master_mute(&mut self, mute: bool) -> Option<Status> {
        self.optional("set_master_mute")?;
        if let Ok(mut state) = self.state.write() {
            state.master_mute = mute;
        }
        Some(0)
    }

    fn master_mute(&self) -> Option<(Status, bool)> {
        self.optional("get_master_mute")?;
        let mute = self.state.read().map(|s| s.master_mute).unwrap_or(false);
        Some((0, mute))
    }

    fn create_audio_patch(
        &mut self,
        sources: &[HwPortConfig],
        sinks: &[HwPortConfig],
        handle: &mut i32,
    ) -> Option<Status> {
        self.optional("create_audio_patch")?;
        let mut state = self.state.write().ok()?;
        if *handle == AUDIO_PATCH_HANDLE_NONE {
            state.next_patch += 1;
            *handle = state.next_patch;
        } else if !state.patches.contains_key(handle) {
            return Some(-libc::EINVAL);
        }
        state
            .patches
            .insert(*handle, (sources.to_vec(), sinks.to_vec()));
        Some(0)
    }

    fn release_audio_patch(&mut self, handle: i32) -> Option<Status> {
        self.optional("release_audio_patch")?;
        let mut state = self.state.write().ok()?;
        match state.patches.remove(&handle) {
            Some(_) => Some(0),
            None => Some(-libc::EINVAL),
        }
    }

    fn get_audio_port(&self, port: &mut HwAudioPort) -> Option<Status> {
        self.optional("get_audio_port")?;
        port.name = format!("mock port {}", port.id);
        port.profiles = vec![(
            AudioFormat::PCM_16_BIT.0,
            vec![44100, 48000],
            vec![ChannelMask::OUT_STEREO.0],
        )];
        Some(0)
    }

    fn set_audio_port_config(&mut self, config: &HwPortConfig) -> Option<Status> {
        self.optional("set_audio_port_config")?;
        let mut state = self.state.write().ok()?;
        state.port_configs.push(config.clone());
        Some(0)
    }

    fn get_microphones(
        &self,
        mics: &mut [HwMicrophoneCharacteristic],
        count: &mut usize,
    ) -> Option<Status> {
        self.optional("get_microphones")?;
        let state = self.state.read().ok()?;
        let available = state.microphones.len().min(mics.len());
        mics[..available].clone_from_slice(&state.microphones[..available]);
        *count = state.reported_microphones.unwrap_or(available);
        Some(0)
    }

    fn add_device_effect(&mut self, port: i32, effect: EffectHandle) -> Option<Status> {
        self.optional("add_device_effect")?;
        let mut state = self.state.write().ok()?;
        state.device_effects.push((port, effect));
        Some(0)
    }

    fn remove_device_effect(&mut self, port: i32, effect: EffectHandle) -> Option<Status> {
        self.optional("remove_device_effect")?;
        let mut state = self.state.write().ok()?;
        state.device_effects.retain(|e| *e != (port, effect));
        Some(0)
    }
}

/// Mock vendor stream
pub struct MockAudioStream {
    state: Arc<RwLock<MockAudioState>>,
    config: HwAudioConfig,
    parameters: BTreeMap<String, String>,
}

impl MockAudioStream {
    /// Stereo 16-bit 48 kHz stream routed nowhere
    pub fn new(state: Arc<RwLock<MockAudioState>>) -> Self {
        let config = HwAudioConfig {
            sample_rate: 48000,
            channel_mask: ChannelMask::OUT_STEREO.0,
            format: AudioFormat::PCM_16_BIT.0,
            frame_count: MOCK_FRAME_COUNT,
        };
        Self::with_config(state, config, 0)
    }

    fn with_config(state: Arc<RwLock<MockAudioState>>, config: HwAudioConfig, devices: u32) -> Self {
        let parameters = [
            (parameters::KEY_ROUTING, devices.to_string()),
            (parameters::KEY_FRAME_COUNT, MOCK_FRAME_COUNT.to_string()),
            (
                parameters::KEY_STREAM_SUPPORTED_SAMPLING_RATES,
                "48000|44100|48000".to_string(),
            ),
            (
                parameters::KEY_STREAM_SUPPORTED_CHANNELS,
                "AUDIO_CHANNEL_OUT_STEREO|AUDIO_CHANNEL_OUT_MONO".to_string(),
            ),
            (
                parameters::KEY_STREAM_SUPPORTED_FORMATS,
                "AUDIO_FORMAT_PCM_16_BIT|AUDIO_FORMAT_PCM_FLOAT".to_string(),
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            state,
            config,
            parameters,
        }
    }

    fn record(&self, entry: &'static str) {
        if let Ok(mut state) = self.state.write() {
            state.record(entry);
        }
    }

    fn apply(&mut self, key: &str, value: &str) -> Status {
        let parsed = value.trim().parse::<u32>();
        match (key, parsed) {
            (parameters::KEY_SAMPLING_RATE, Ok(rate)) => {
                let cap = self.state.read().ok().and_then(|s| s.stream_rate_cap);
                self.config.sample_rate = cap.map_or(rate, |cap| rate.min(cap));
            }
            (parameters::KEY_CHANNELS, Ok(mask)) => self.config.channel_mask = mask,
            (parameters::KEY_FORMAT, Ok(format)) => self.config.format = format,
            (parameters::KEY_SAMPLING_RATE | parameters::KEY_CHANNELS | parameters::KEY_FORMAT, Err(_)) => {
                return -libc::EINVAL;
            }
            _ => {
                self.parameters.insert(key.to_string(), value.to_string());
            }
        }
        0
    }
}

impl HwStream for MockAudioStream {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn channels(&self) -> u32 {
        self.config.channel_mask
    }

    fn format(&self) -> u32 {
        self.config.format
    }

    fn buffer_size(&self) -> usize {
        let bytes = AudioFormat(self.config.format)
            .bytes_per_sample()
            .unwrap_or(1);
        let channels = ChannelMask(self.config.channel_mask).channel_count() as usize;
        MOCK_FRAME_COUNT as usize * bytes * channels
    }

    fn standby(&mut self) -> Status {
        self.record("standby");
        0
    }

    fn dump(&self, fd: BorrowedFd<'_>) -> Status {
        self.record("stream_dump");
        match nix::unistd::write(fd, b"mock audio stream\n") {
            Ok(_) => 0,
            Err(errno) => -(errno as i32),
        }
    }

    fn get_parameters(&self, keys: &str) -> Option<String> {
        self.record("stream_get_parameters");
        Some(answer(&self.parameters, keys))
    }

    fn set_parameters(&mut self, key_values: &str) -> Status {
        self.record("stream_set_parameters");
        let params = AudioParameter::parse(key_values);
        for (key, value) in params.iter() {
            let status = self.apply(key, value);
            if status != 0 {
                return status;
            }
        }
        0
    }

    fn add_audio_effect(&mut self, effect: EffectHandle) -> Status {
        self.record("add_audio_effect");
        if let Ok(mut state) = self.state.write() {
            state.stream_effects.push(effect);
        }
        0
    }

    fn remove_audio_effect(&mut self, effect: EffectHandle) -> Status {
        self.record("remove_audio_effect");
        if let Ok(mut state) = self.state.write() {
            state.stream_effects.retain(|e| *e != effect);
        }
        0
    }

    fn update_source_metadata(&mut self, metadata: &SourceMetadata) -> Option<()> {
        self.record("update_source_metadata");
        let mut state = self.state.write().ok()?;
        state.source_metadata = Some(metadata.clone());
        Some(())
    }

    fn update_sink_metadata(&mut self, metadata: &SinkMetadata) -> Option<()> {
        self.record("update_sink_metadata");
        let mut state = self.state.write().ok()?;
        state.sink_metadata = Some(metadata.clone());
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_calls() {
        let mut hw = MockAudioHw::new(HwApiVersion::V3_0);
        let state = hw.state();
        assert_eq!(hw.set_master_volume(0.3), Some(0));
        assert_eq!(hw.master_volume(), Some((0, 0.3)));
        assert_eq!(state.read().unwrap().calls("set_master_volume"), 1);
    }

    #[test]
    fn test_mock_without_optional_entries() {
        let mut hw = MockAudioHw::new(HwApiVersion::V3_0).without_optional_entries();
        assert_eq!(hw.set_master_volume(0.3), None);
        assert_eq!(hw.release_audio_patch(1), None);
        assert_eq!(hw.state().read().unwrap().calls("set_master_volume"), 0);
    }

    #[test]
    fn test_mock_stream_rate_cap() {
        let state = Arc::new(RwLock::new(MockAudioState::new()));
        state.write().unwrap().stream_rate_cap = Some(44100);
        let mut stream = MockAudioStream::new(state);
        assert_eq!(stream.set_parameters("sampling_rate=96000"), 0);
        assert_eq!(stream.sample_rate(), 44100);
        assert_eq!(stream.set_parameters("format=pcm"), -libc::EINVAL);
    }

    #[test]
    fn test_mock_patch_handles() {
        let mut hw = MockAudioHw::new(HwApiVersion::V3_0);
        let mut handle = AUDIO_PATCH_HANDLE_NONE;
        assert_eq!(hw.create_audio_patch(&[], &[], &mut handle), Some(0));
        assert_eq!(handle, 1);
        assert_eq!(hw.release_audio_patch(handle), Some(0));
        assert_eq!(hw.release_audio_patch(handle), Some(-libc::EINVAL));
    }
}
