//! Device address encoding
//!
//! The vendor library identifies a device by its type bitmask plus a flat,
//! NUL-terminated address string whose format depends on the device class.

use super::types::{AUDIO_DEVICE_MAX_ADDRESS_LEN, AudioDevice};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const OUT_ALL_A2DP: u32 = AudioDevice::OUT_BLUETOOTH_A2DP.0
    | AudioDevice::OUT_BLUETOOTH_A2DP_HEADPHONES.0
    | AudioDevice::OUT_BLUETOOTH_A2DP_SPEAKER.0;
const OUT_ALL_USB: u32 =
    AudioDevice::OUT_USB_ACCESSORY.0 | AudioDevice::OUT_USB_DEVICE.0 | AudioDevice::OUT_USB_HEADSET.0;
const IN_ALL_USB: u32 = (AudioDevice::IN_USB_ACCESSORY.0
    | AudioDevice::IN_USB_DEVICE.0
    | AudioDevice::IN_USB_HEADSET.0)
    & !AudioDevice::BIT_IN;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("expected {expected} {class:?} fields in {raw:?}, scanned {scanned}")]
    FieldCount {
        class: AddressClass,
        expected: usize,
        scanned: usize,
        raw: String,
    },
}

/// Address format selected by the device type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    Mac,
    Ipv4,
    Alsa,
    Bus,
    RemoteSubmix,
    Other,
}

impl AddressClass {
    /// Classify a device bitmask, ignoring its direction bit
    pub fn of(device: AudioDevice) -> Self {
        let input = device.is_input();
        let bits = device.without_direction();
        let matches = |out: u32, inp: AudioDevice| {
            if input {
                bits & (inp.0 & !AudioDevice::BIT_IN) != 0
            } else {
                bits & out != 0
            }
        };

        if matches(OUT_ALL_A2DP, AudioDevice::IN_BLUETOOTH_A2DP) {
            AddressClass::Mac
        } else if matches(AudioDevice::OUT_IP.0, AudioDevice::IN_IP) {
            AddressClass::Ipv4
        } else if (input && bits & IN_ALL_USB != 0) || (!input && bits & OUT_ALL_USB != 0) {
            AddressClass::Alsa
        } else if matches(AudioDevice::OUT_BUS.0, AudioDevice::IN_BUS) {
            AddressClass::Bus
        } else if matches(AudioDevice::OUT_REMOTE_SUBMIX.0, AudioDevice::IN_REMOTE_SUBMIX) {
            AddressClass::RemoteSubmix
        } else {
            AddressClass::Other
        }
    }

    fn arity(self) -> usize {
        match self {
            AddressClass::Mac => 6,
            AddressClass::Ipv4 => 4,
            AddressClass::Alsa => 2,
            _ => 1,
        }
    }
}

/// Address payload, one variant per device class
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AddressData {
    #[default]
    None,
    Mac([u8; 6]),
    Ipv4([u8; 4]),
    Alsa { card: i32, device: i32 },
    Bus(String),
    RemoteSubmix(String),
}

/// A device type together with its address
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceAddress {
    pub device: AudioDevice,
    pub address: AddressData,
}

impl DeviceAddress {
    /// Address-less device
    pub fn new(device: AudioDevice) -> Self {
        Self {
            device,
            address: AddressData::None,
        }
    }

    pub fn with_address(device: AudioDevice, address: AddressData) -> Self {
        Self { device, address }
    }
}

/// Encode an address into the vendor string form
///
/// The result always fits a vendor address buffer with its terminator.
pub fn encode(address: &DeviceAddress) -> String {
    let encoded = match AddressClass::of(address.device) {
        AddressClass::Mac => {
            let mac = match &address.address {
                AddressData::Mac(mac) => *mac,
                _ => [0; 6],
            };
            format!(
                "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
                mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
            )
        }
        AddressClass::Ipv4 => {
            let ip = match &address.address {
                AddressData::Ipv4(ip) => *ip,
                _ => [0; 4],
            };
            format!("{}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3])
        }
        AddressClass::Alsa => {
            let (card, device) = match &address.address {
                AddressData::Alsa { card, device } => (*card, *device),
                _ => (0, 0),
            };
            format!("card={};device={}", card, device)
        }
        AddressClass::Bus => match &address.address {
            AddressData::Bus(bus) => bus.clone(),
            _ => String::new(),
        },
        AddressClass::RemoteSubmix => match &address.address {
            AddressData::RemoteSubmix(name) => name.clone(),
            _ => String::new(),
        },
        AddressClass::Other => String::new(),
    };

    truncate_to_limit(encoded)
}

fn truncate_to_limit(mut s: String) -> String {
    let limit = AUDIO_DEVICE_MAX_ADDRESS_LEN - 1;
    if s.len() > limit {
        let mut end = limit;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}

/// Decode a vendor address string for the given device type
///
/// An empty string yields an address-less device. Unknown device classes keep
/// the raw string in the bus field.
pub fn decode(device: AudioDevice, raw: &str) -> Result<DeviceAddress, AddressParseError> {
    let raw = raw.split('\0').next().unwrap_or_default();
    if raw.is_empty() {
        return Ok(DeviceAddress::new(device));
    }

    let class = AddressClass::of(device);
    let field_error = |scanned: usize| AddressParseError::FieldCount {
        class,
        expected: class.arity(),
        scanned,
        raw: raw.to_string(),
    };

    let address = match class {
        AddressClass::Mac => {
            let octets = scan(raw.split(':'), 6, |p| u8::from_str_radix(p, 16).ok());
            let mac: [u8; 6] = octets
                .as_slice()
                .try_into()
                .map_err(|_| field_error(octets.len()))?;
            AddressData::Mac(mac)
        }
        AddressClass::Ipv4 => {
            let octets = scan(raw.split('.'), 4, |p| p.parse::<u8>().ok());
            let ip: [u8; 4] = octets
                .as_slice()
                .try_into()
                .map_err(|_| field_error(octets.len()))?;
            AddressData::Ipv4(ip)
        }
        AddressClass::Alsa => {
            let fields = scan_alsa(raw);
            match fields.as_slice() {
                [card, device] => AddressData::Alsa {
                    card: *card,
                    device: *device,
                },
                _ => return Err(field_error(fields.len())),
            }
        }
        AddressClass::RemoteSubmix => AddressData::RemoteSubmix(raw.to_string()),
        AddressClass::Bus | AddressClass::Other => AddressData::Bus(raw.to_string()),
    };

    Ok(DeviceAddress { device, address })
}

/// Parse leading fields until the first one that fails, like a scanf
fn scan<'a, T>(
    parts: impl Iterator<Item = &'a str>,
    max: usize,
    parse: impl Fn(&str) -> Option<T>,
) -> Vec<T> {
    parts.take(max).map_while(|p| parse(p.trim())).collect()
}

fn scan_alsa(raw: &str) -> Vec<i32> {
    let mut fields = Vec::with_capacity(2);
    let Some(rest) = raw.strip_prefix("card=") else {
        return fields;
    };
    let (card, rest) = rest.split_once(';').unwrap_or((rest, ""));
    let Ok(card) = card.trim().parse() else {
        return fields;
    };
    fields.push(card);

    if let Some(Ok(device)) = rest.strip_prefix("device=").map(|d| d.trim().parse()) {
        fields.push(device);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_round_trip() {
        let address = DeviceAddress::with_address(
            AudioDevice::OUT_BLUETOOTH_A2DP,
            AddressData::Mac([0x00, 0x1A, 0x7D, 0xDA, 0x71, 0x13]),
        );
        let encoded = encode(&address);
        assert_eq!(encoded, "00:1A:7D:DA:71:13");
        assert_eq!(decode(address.device, &encoded).unwrap(), address);
    }

    #[test]
    fn test_ipv4_round_trip() {
        let address =
            DeviceAddress::with_address(AudioDevice::IN_IP, AddressData::Ipv4([192, 168, 1, 20]));
        let encoded = encode(&address);
        assert_eq!(encoded, "192.168.1.20");
        assert_eq!(decode(address.device, &encoded).unwrap(), address);
    }

    #[test]
    fn test_alsa_round_trip() {
        for device in [AudioDevice::OUT_USB_HEADSET, AudioDevice::IN_USB_DEVICE] {
            let address = DeviceAddress::with_address(
                device,
                AddressData::Alsa {
                    card: 1,
                    device: 3,
                },
            );
            let encoded = encode(&address);
            assert_eq!(encoded, "card=1;device=3");
            assert_eq!(decode(device, &encoded).unwrap(), address);
        }
    }

    #[test]
    fn test_bus_and_submix_raw_strings() {
        let bus = DeviceAddress::with_address(
            AudioDevice::OUT_BUS,
            AddressData::Bus("bus0_media_out".into()),
        );
        assert_eq!(encode(&bus), "bus0_media_out");
        assert_eq!(decode(bus.device, "bus0_media_out").unwrap(), bus);

        let submix = DeviceAddress::with_address(
            AudioDevice::IN_REMOTE_SUBMIX,
            AddressData::RemoteSubmix("0".into()),
        );
        assert_eq!(encode(&submix), "0");
        assert_eq!(decode(submix.device, "0").unwrap(), submix);
    }

    #[test]
    fn test_short_mac_is_rejected() {
        let err = decode(AudioDevice::OUT_BLUETOOTH_A2DP, "00:1A:7D:DA").unwrap_err();
        assert_eq!(
            err,
            AddressParseError::FieldCount {
                class: AddressClass::Mac,
                expected: 6,
                scanned: 4,
                raw: "00:1A:7D:DA".into(),
            }
        );
    }

    #[test]
    fn test_bad_ipv4_and_alsa() {
        assert!(decode(AudioDevice::OUT_IP, "10.0.300.1").is_err());
        assert!(decode(AudioDevice::OUT_USB_DEVICE, "card=2").is_err());
        assert!(decode(AudioDevice::OUT_USB_DEVICE, "device=2").is_err());
    }

    #[test]
    fn test_empty_input_yields_zero_address() {
        let address = decode(AudioDevice::OUT_BLUETOOTH_A2DP, "").unwrap();
        assert_eq!(address, DeviceAddress::new(AudioDevice::OUT_BLUETOOTH_A2DP));
    }

    #[test]
    fn test_unknown_class_is_permissive() {
        let address = decode(AudioDevice::OUT_SPEAKER, "whatever").unwrap();
        assert_eq!(address.address, AddressData::Bus("whatever".into()));
        assert_eq!(encode(&address), "");
    }

    #[test]
    fn test_direction_bit_selects_input_class() {
        // 0x80 is A2DP for outputs but the back mic for inputs
        assert_eq!(AddressClass::of(AudioDevice::OUT_BLUETOOTH_A2DP), AddressClass::Mac);
        assert_eq!(AddressClass::of(AudioDevice::IN_BACK_MIC), AddressClass::Other);
    }

    #[test]
    fn test_encoding_is_bounded() {
        let long = "x".repeat(64);
        let address =
            DeviceAddress::with_address(AudioDevice::OUT_BUS, AddressData::Bus(long));
        assert_eq!(encode(&address).len(), AUDIO_DEVICE_MAX_ADDRESS_LEN - 1);
    }
}
