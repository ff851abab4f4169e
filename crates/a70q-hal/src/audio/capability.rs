//! Vendor microphone enumerations to protocol enumerations
//!
//! Unknown vendor values do not fail: they map to the indeterminate variant.

use super::address;
use super::hw::{self, HwMicrophoneCharacteristic};
use super::types::{
    AudioDevice, Coordinate, FrequencyResponsePoint, MicrophoneChannelMapping,
    MicrophoneDirectionality, MicrophoneInfo, MicrophoneLocation,
};

pub fn channel_mapping_from_hal(mapping: u32) -> MicrophoneChannelMapping {
    match mapping {
        hw::HW_CHANNEL_MAPPING_UNUSED => MicrophoneChannelMapping::Unused,
        hw::HW_CHANNEL_MAPPING_DIRECT => MicrophoneChannelMapping::Direct,
        hw::HW_CHANNEL_MAPPING_PROCESSED => MicrophoneChannelMapping::Processed,
        other => {
            tracing::warn!("Invalid channel mapping type: {}", other);
            MicrophoneChannelMapping::Unused
        }
    }
}

pub fn location_from_hal(location: u32) -> MicrophoneLocation {
    match location {
        hw::HW_LOCATION_MAINBODY => MicrophoneLocation::MainBody,
        hw::HW_LOCATION_MAINBODY_MOVABLE => MicrophoneLocation::MainBodyMovable,
        hw::HW_LOCATION_PERIPHERAL => MicrophoneLocation::Peripheral,
        hw::HW_LOCATION_UNKNOWN => MicrophoneLocation::Unknown,
        other => {
            tracing::warn!("Invalid microphone location: {}", other);
            MicrophoneLocation::Unknown
        }
    }
}

pub fn directionality_from_hal(directionality: u32) -> MicrophoneDirectionality {
    match directionality {
        hw::HW_DIRECTIONALITY_OMNI => MicrophoneDirectionality::Omni,
        hw::HW_DIRECTIONALITY_BI_DIRECTIONAL => MicrophoneDirectionality::BiDirectional,
        hw::HW_DIRECTIONALITY_CARDIOID => MicrophoneDirectionality::Cardioid,
        hw::HW_DIRECTIONALITY_HYPER_CARDIOID => MicrophoneDirectionality::HyperCardioid,
        hw::HW_DIRECTIONALITY_SUPER_CARDIOID => MicrophoneDirectionality::SuperCardioid,
        hw::HW_DIRECTIONALITY_UNKNOWN => MicrophoneDirectionality::Unknown,
        other => {
            tracing::warn!("Invalid microphone directionality: {}", other);
            MicrophoneDirectionality::Unknown
        }
    }
}

/// Build a complete microphone descriptor, or nothing
pub fn microphone_from_hal(src: &HwMicrophoneCharacteristic) -> Option<MicrophoneInfo> {
    let device_address = match address::decode(AudioDevice(src.device), &src.address) {
        Ok(address) => address,
        Err(e) => {
            tracing::warn!("Microphone {} has a bad address: {}", src.device_id, e);
            return None;
        }
    };

    let responses = src
        .num_frequency_responses
        .min(hw::AUDIO_MICROPHONE_MAX_FREQUENCY_RESPONSES);
    let frequency_response = (0..responses)
        .map(|k| FrequencyResponsePoint {
            frequency: src.frequency_responses[0][k],
            level: src.frequency_responses[1][k],
        })
        .collect();

    Some(MicrophoneInfo {
        device_id: src.device_id.clone(),
        device_address,
        channel_mapping: src
            .channel_mapping
            .iter()
            .map(|m| channel_mapping_from_hal(*m))
            .collect(),
        location: location_from_hal(src.location),
        group: src.group,
        index_in_the_group: src.index_in_the_group,
        sensitivity: src.sensitivity,
        max_spl: src.max_spl,
        min_spl: src.min_spl,
        directionality: directionality_from_hal(src.directionality),
        frequency_response,
        position: Coordinate {
            x: src.geometric_location.x,
            y: src.geometric_location.y,
            z: src.geometric_location.z,
        },
        orientation: Coordinate {
            x: src.orientation.x,
            y: src.orientation.y,
            z: src.orientation.z,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::address::AddressData;
    use crate::audio::types::AUDIO_CHANNEL_COUNT_MAX;

    #[test]
    fn test_enum_mapping() {
        assert_eq!(channel_mapping_from_hal(1), MicrophoneChannelMapping::Direct);
        assert_eq!(location_from_hal(3), MicrophoneLocation::Peripheral);
        assert_eq!(directionality_from_hal(4), MicrophoneDirectionality::HyperCardioid);
    }

    #[test]
    fn test_unknown_values_are_indeterminate() {
        assert_eq!(channel_mapping_from_hal(99), MicrophoneChannelMapping::Unused);
        assert_eq!(location_from_hal(42), MicrophoneLocation::Unknown);
        assert_eq!(directionality_from_hal(7), MicrophoneDirectionality::Unknown);
    }

    #[test]
    fn test_microphone_conversion() {
        let mut src = HwMicrophoneCharacteristic {
            device_id: "builtin_mic".into(),
            device: AudioDevice::IN_BUILTIN_MIC.bits(),
            location: hw::HW_LOCATION_MAINBODY,
            directionality: hw::HW_DIRECTIONALITY_OMNI,
            sensitivity: -37.0,
            num_frequency_responses: 2,
            ..Default::default()
        };
        src.channel_mapping[0] = hw::HW_CHANNEL_MAPPING_DIRECT;
        src.frequency_responses[0][..2].copy_from_slice(&[100.0, 1000.0]);
        src.frequency_responses[1][..2].copy_from_slice(&[-2.0, 0.0]);
        src.geometric_location = hw::HwCoordinate { x: 0.1, y: 0.2, z: 0.0 };

        let info = microphone_from_hal(&src).unwrap();
        assert_eq!(info.device_id, "builtin_mic");
        assert_eq!(info.device_address.address, AddressData::None);
        assert_eq!(info.channel_mapping.len(), AUDIO_CHANNEL_COUNT_MAX);
        assert_eq!(info.channel_mapping[0], MicrophoneChannelMapping::Direct);
        assert_eq!(info.channel_mapping[1], MicrophoneChannelMapping::Unused);
        assert_eq!(info.location, MicrophoneLocation::MainBody);
        assert_eq!(info.frequency_response.len(), 2);
        assert_eq!(info.frequency_response[1].frequency, 1000.0);
        assert_eq!(info.position.y, 0.2);
    }

    #[test]
    fn test_bad_address_rejects_microphone() {
        let src = HwMicrophoneCharacteristic {
            device: AudioDevice::IN_BLUETOOTH_A2DP.bits(),
            address: "not-a-mac".into(),
            ..Default::default()
        };
        assert!(microphone_from_hal(&src).is_none());
    }
}
