// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Device profiles and the device configuration lookup

use crate::error::LookupError;
use ripeline_sessions::DeviceKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label used for every field of the fallback profile
pub const DEFAULT_LABEL: &str = "default";

/// What the gateway needs to know about a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub fruit: String,
    pub variety: String,
    /// Per-channel calibration reference
    pub white_standard: Vec<f64>,
    pub batch_number: String,
    pub vendor_code: String,
}

impl DeviceProfile {
    /// Profile used when a device cannot be looked up
    pub fn fallback(default_white_standard: &[f64]) -> Self {
        Self {
            fruit: DEFAULT_LABEL.to_string(),
            variety: DEFAULT_LABEL.to_string(),
            white_standard: default_white_standard.to_vec(),
            batch_number: DEFAULT_LABEL.to_string(),
            vendor_code: DEFAULT_LABEL.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fruit == DEFAULT_LABEL && self.variety == DEFAULT_LABEL
    }
}

/// Resolves a device key to its profile
pub trait DeviceConfigLookup: Send + Sync {
    fn lookup(&self, key: &DeviceKey) -> Result<DeviceProfile, LookupError>;

    /// Every `(fruit, variety)` this lookup can return, for model preloading
    fn varieties(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// In-memory directory built from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticDeviceDirectory {
    devices: HashMap<DeviceKey, DeviceProfile>,
}

impl StaticDeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a device
    pub fn insert(&mut self, key: DeviceKey, profile: DeviceProfile) {
        self.devices.insert(key, profile);
    }

    pub fn with_device(mut self, key: DeviceKey, profile: DeviceProfile) -> Self {
        self.insert(key, profile);
        self
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl DeviceConfigLookup for StaticDeviceDirectory {
    fn lookup(&self, key: &DeviceKey) -> Result<DeviceProfile, LookupError> {
        self.devices
            .get(key)
            .cloned()
            .ok_or_else(|| LookupError::UnknownDevice(key.to_string()))
    }

    fn varieties(&self) -> Vec<(String, String)> {
        let mut varieties: Vec<(String, String)> = self
            .devices
            .values()
            .map(|p| (p.fruit.clone(), p.variety.clone()))
            .collect();
        varieties.sort();
        varieties.dedup();
        varieties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mango() -> DeviceProfile {
        DeviceProfile {
            fruit: "mango".to_string(),
            variety: "alphonso".to_string(),
            white_standard: vec![2.0, 4.0],
            batch_number: "B7".to_string(),
            vendor_code: "V3".to_string(),
        }
    }

    #[test]
    fn test_lookup_hit_and_miss() {
        let directory = StaticDeviceDirectory::new().with_device(DeviceKey::new("W1", "D1"), mango());

        assert_eq!(directory.lookup(&DeviceKey::new("W1", "D1")), Ok(mango()));
        assert_eq!(
            directory.lookup(&DeviceKey::new("W1", "D9")),
            Err(LookupError::UnknownDevice("W1/D9".to_string()))
        );
    }

    #[test]
    fn test_fallback_profile() {
        let profile = DeviceProfile::fallback(&[1.0; 6]);
        assert!(profile.is_fallback());
        assert_eq!(profile.batch_number, "default");
        assert_eq!(profile.white_standard.len(), 6);
    }

    #[test]
    fn test_varieties_deduplicated() {
        let directory = StaticDeviceDirectory::new()
            .with_device(DeviceKey::new("W1", "D1"), mango())
            .with_device(DeviceKey::new("W1", "D2"), mango());
        assert_eq!(
            directory.varieties(),
            vec![("mango".to_string(), "alphonso".to_string())]
        );
    }
}
