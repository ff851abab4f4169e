//! Keyed parameter protocol
//!
//! Settings without a dedicated vendor entry travel as `key=value;key=value`
//! strings. Devices and streams share the helpers through [`ParametersUtil`].

use super::address::{self, DeviceAddress};
use super::hw::Status;
use super::status::{self, AudioError, Result};
use super::types::ParameterValue;
use std::collections::BTreeMap;
use std::fmt;

pub const KEY_ROUTING: &str = "routing";
pub const KEY_SAMPLING_RATE: &str = "sampling_rate";
pub const KEY_CHANNELS: &str = "channels";
pub const KEY_FORMAT: &str = "format";
pub const KEY_FRAME_COUNT: &str = "frame_count";
pub const KEY_HW_AV_SYNC: &str = "hw_av_sync";
pub const KEY_STREAM_HW_AV_SYNC: &str = "stream_hw_av_sync";
pub const KEY_SCREEN_STATE: &str = "screen_state";
pub const KEY_DEVICE_CONNECT: &str = "connect";
pub const KEY_DEVICE_DISCONNECT: &str = "disconnect";
pub const KEY_STREAM_CONNECT: &str = "stream_connect";
pub const KEY_STREAM_DISCONNECT: &str = "stream_disconnect";
pub const KEY_STREAM_SUPPORTED_SAMPLING_RATES: &str = "sup_sampling_rates";
pub const KEY_STREAM_SUPPORTED_CHANNELS: &str = "sup_channels";
pub const KEY_STREAM_SUPPORTED_FORMATS: &str = "sup_formats";

pub const VALUE_ON: &str = "on";
pub const VALUE_OFF: &str = "off";
pub const VALUE_LIST_SEPARATOR: char = '|';

/// Why a key lookup failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    Missing,
    Malformed,
}

impl From<LookupError> for AudioError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::Missing => AudioError::InvalidArguments,
            LookupError::Malformed => AudioError::NotSupported,
        }
    }
}

/// Sorted key/value set in the vendor string form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioParameter {
    params: BTreeMap<String, String>,
}

impl AudioParameter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key=value;key;...`; bare keys get an empty value
    pub fn parse(s: &str) -> Self {
        let params = s
            .split(';')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
            })
            .collect();
        Self { params }
    }

    pub fn add(&mut self, key: &str, value: &str) {
        self.params.insert(key.to_string(), value.to_string());
    }

    pub fn add_int(&mut self, key: &str, value: i64) {
        self.add(key, &value.to_string());
    }

    pub fn add_key(&mut self, key: &str) {
        self.add(key, "");
    }

    pub fn get(&self, key: &str) -> std::result::Result<&str, LookupError> {
        self.params
            .get(key)
            .map(String::as_str)
            .ok_or(LookupError::Missing)
    }

    pub fn get_int(&self, key: &str) -> std::result::Result<i64, LookupError> {
        self.get(key)?
            .trim()
            .parse()
            .map_err(|_| LookupError::Malformed)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Get request form: bare keys, `key=value` for context entries
    pub fn keys_to_string(&self) -> String {
        self.params
            .iter()
            .map(|(key, value)| {
                if value.is_empty() {
                    key.clone()
                } else {
                    format!("{}={}", key, value)
                }
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Display for AudioParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.params {
            if !first {
                f.write_str(";")?;
            }
            first = false;
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

/// Parameter helpers on top of a vendor get/set pair
pub trait ParametersUtil {
    /// Class name used in log lines
    fn class_name(&self) -> &'static str;

    fn hal_get_parameters(&self, keys: &str) -> Option<String>;

    fn hal_set_parameters(&self, key_values: &str) -> Status;

    fn params(&self, keys: &AudioParameter) -> AudioParameter {
        self.hal_get_parameters(&keys.keys_to_string())
            .map(|reply| AudioParameter::parse(&reply))
            .unwrap_or_default()
    }

    fn param_str(&self, name: &str, context: &AudioParameter) -> Result<String> {
        let mut keys = context.clone();
        keys.add_key(name);
        Ok(self.params(&keys).get(name)?.to_string())
    }

    fn param_int(&self, name: &str) -> Result<i64> {
        let mut keys = AudioParameter::new();
        keys.add_key(name);
        Ok(self.params(&keys).get_int(name)?)
    }

    /// Boolean parameter; an empty value means the vendor does not know the key
    fn param_bool(&self, name: &str) -> Result<bool> {
        let value = self.param_str(name, &AudioParameter::new())?;
        if value.is_empty() {
            return Err(AudioError::NotSupported);
        }
        Ok(value != VALUE_OFF)
    }

    /// Query several keys at once
    ///
    /// Returns what the vendor answered; NotSupported when some key got no answer.
    fn parameters_impl(
        &self,
        context: &[ParameterValue],
        keys: &[String],
    ) -> (Result<()>, Vec<ParameterValue>) {
        if keys.is_empty() {
            return (Ok(()), Vec::new());
        }

        let mut request = AudioParameter::new();
        for ctx in context {
            request.add(&ctx.key, &ctx.value);
        }
        for key in keys {
            request.add_key(key);
        }

        let reply = self.params(&request);
        let values: Vec<ParameterValue> = reply
            .iter()
            .filter(|(key, _)| keys.iter().any(|k| k == key))
            .map(|(key, value)| ParameterValue::new(key, value))
            .collect();
        let result = if values.len() == keys.len() {
            Ok(())
        } else {
            Err(AudioError::NotSupported)
        };
        (result, values)
    }

    fn set_parameters_impl(
        &self,
        context: &[ParameterValue],
        parameters: &[ParameterValue],
    ) -> Result<()> {
        let mut params = AudioParameter::new();
        for p in context.iter().chain(parameters) {
            params.add(&p.key, &p.value);
        }
        self.set_params(&params)
    }

    fn set_param_bool(&self, name: &str, value: bool) -> Result<()> {
        let mut params = AudioParameter::new();
        params.add(name, if value { VALUE_ON } else { VALUE_OFF });
        self.set_params(&params)
    }

    fn set_param_int(&self, name: &str, value: i64) -> Result<()> {
        let mut params = AudioParameter::new();
        params.add_int(name, value);
        self.set_params(&params)
    }

    /// Send a device address: its encoded fields plus `name=<device bits>`
    fn set_param_address(&self, name: &str, address: &DeviceAddress) -> Result<()> {
        let mut params = AudioParameter::parse(&address::encode(address));
        params.add_int(name, i64::from(address.device.bits()));
        self.set_params(&params)
    }

    fn set_params(&self, params: &AudioParameter) -> Result<()> {
        let status = self.hal_set_parameters(&params.to_string());
        status::analyze_status(self.class_name(), "set_parameters", status, &[])
    }
}
