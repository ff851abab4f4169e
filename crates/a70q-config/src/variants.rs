//! Device variant detection from the bootloader string

use crate::PropertyStore;
use serde::Serialize;

/// Known retail model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Variant {
    pub model: &'static str,
    pub device: &'static str,
}

pub const VARIANTS: &[Variant] = &[
    Variant { model: "SM-A705F", device: "a70q" },
    Variant { model: "SM-A705FN", device: "a70q" },
    Variant { model: "SM-A705GM", device: "a70q" },
    Variant { model: "SM-A705MN", device: "a70q" },
    Variant { model: "SM-A7050", device: "a70q" },
    Variant { model: "SM-A705W", device: "a70q" },
    Variant { model: "SM-A705YN", device: "a70q" },
    Variant { model: "SM-A705U", device: "a70q" },
];

pub const DEFAULT_MODEL: &str = "A705FN";
pub const DEFAULT_BUILD: &str = "XXU5DWB4";
pub const DEFAULT_DEVICE: &str = "a70q";

/// Property partitions that receive the model overrides
const PRODUCT_PARTITIONS: &[&str] = &["", "vendor.", "product.", "odm."];

/// Identity derived from the bootloader version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelIdentity {
    pub bootloader_model: String,
    pub build: String,
    /// Retail model, e.g. `SM-A705FN`
    pub model: String,
    pub device: String,
    pub name: String,
}

/// Split the bootloader string into model and build.
///
/// 13 characters carry a five character model, 14 carry six. Anything else
/// falls back to the A705FN defaults. An unknown model keeps its name but is
/// forced onto the a70q device.
pub fn detect_model(bootloader: &str) -> ModelIdentity {
    let parts = match bootloader.len() {
        13 => bootloader.split_at_checked(5),
        14 => bootloader.split_at_checked(6),
        _ => None,
    };

    let (bootloader_model, build) = match parts {
        Some((model, build)) => (model.to_string(), build.to_string()),
        None => {
            tracing::error!("Could not detect model, defaulting to {}", DEFAULT_MODEL);
            (DEFAULT_MODEL.to_string(), DEFAULT_BUILD.to_string())
        }
    };

    let model = format!("SM-{}", bootloader_model);
    let device = match VARIANTS.iter().find(|v| v.model == model) {
        Some(variant) => variant.device.to_string(),
        None => {
            tracing::error!("Could not detect device, forcing {}", DEFAULT_DEVICE);
            DEFAULT_DEVICE.to_string()
        }
    };
    let name = format!("{}xx", device);

    tracing::info!("Bootloader model: {}", bootloader_model);
    tracing::info!("Build: {}", build);
    tracing::info!("Model: {}, device: {}, name: {}", model, device, name);

    ModelIdentity {
        bootloader_model,
        build,
        model,
        device,
        name,
    }
}

impl ModelIdentity {
    /// Properties to set for this identity, in write order
    pub fn property_overrides(&self) -> Vec<(String, String)> {
        let mut out = Vec::with_capacity(PRODUCT_PARTITIONS.len() * 3 + 1);
        for partition in PRODUCT_PARTITIONS {
            out.push((format!("ro.product.{}model", partition), self.model.clone()));
            out.push((format!("ro.product.{}device", partition), self.device.clone()));
            out.push((format!("ro.product.{}name", partition), self.name.clone()));
        }
        out.push(("ro.build.product".to_string(), self.device.clone()));
        out
    }

    pub fn apply(&self, store: &mut PropertyStore) {
        for (key, value) in self.property_overrides() {
            store.override_property(&key, &value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_six_char_model() {
        let id = detect_model("A705FNXXU5DWB4");
        assert_eq!(id.bootloader_model, "A705FN");
        assert_eq!(id.build, "XXU5DWB4");
        assert_eq!(id.model, "SM-A705FN");
        assert_eq!(id.device, "a70q");
        assert_eq!(id.name, "a70qxx");
    }

    #[test]
    fn test_five_char_model() {
        let id = detect_model("A705FXXU5DWB4");
        assert_eq!(id.model, "SM-A705F");
        assert_eq!(id.build, "XXU5DWB4");
    }

    #[test]
    fn test_unexpected_length_defaults() {
        let id = detect_model("short");
        assert_eq!(id.model, "SM-A705FN");
        assert_eq!(id.build, DEFAULT_BUILD);
        assert_eq!(detect_model("").model, "SM-A705FN");
    }

    #[test]
    fn test_unknown_model_forced() {
        let id = detect_model("B999ZZXXU1AAA1");
        assert_eq!(id.model, "SM-B999ZZ");
        assert_eq!(id.device, "a70q");
    }

    #[test]
    fn test_non_ascii_bootloader() {
        // 14 bytes with a multi-byte char straddling the split point
        let id = detect_model("A7050éXXU5DWB");
        assert_eq!(id.model, "SM-A705FN");
    }

    #[test]
    fn test_overrides() {
        let id = detect_model("A705GMXXU5DWB4");
        let overrides = id.property_overrides();
        assert_eq!(overrides.len(), 13);
        assert!(overrides.contains(&("ro.product.model".into(), "SM-A705GM".into())));
        assert!(overrides.contains(&("ro.product.odm.name".into(), "a70qxx".into())));
        assert_eq!(overrides.last().unwrap().0, "ro.build.product");

        let mut store = PropertyStore::new();
        id.apply(&mut store);
        assert_eq!(store.get("ro.product.vendor.device"), Some("a70q"));
    }
}
