// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Core value types: device keys and readings

use std::fmt;

/// Composite device identifier `(warehouse_id, device_id)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKey {
    pub warehouse_id: String,
    pub device_id: String,
}

impl DeviceKey {
    pub fn new(warehouse_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            warehouse_id: warehouse_id.into(),
            device_id: device_id.into(),
        }
    }

    /// Topic that feedback for this device is published on: `/{warehouse}/{device}`
    pub fn feedback_topic(&self) -> String {
        format!("/{}/{}", self.warehouse_id, self.device_id)
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.warehouse_id, self.device_id)
    }
}

/// One raw sensor reading (one value per channel)
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub values: Vec<f64>,
}

impl Reading {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Number of channels in this reading
    pub fn width(&self) -> usize {
        self.values.len()
    }
}
