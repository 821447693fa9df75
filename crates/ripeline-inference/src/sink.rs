// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Result persistence
//!
//! Every processed batch becomes a [`BatchResult`]. The default sink writes
//! one JSON document per line; status flips are appended as amendments to the
//! same journal rather than rewriting earlier lines.

use crate::band::BrixBand;
use crate::error::SinkError;
use crate::feedback::Prediction;
use crate::profile::DeviceProfile;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use ripeline_sessions::DeviceKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One persisted batch outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub warehouse_id: String,
    pub device_id: String,
    /// Per-channel means of the batch, NaN replaced by 0.0
    pub readings: Vec<f64>,
    /// Leading channels keyed by their configured names
    pub channels: BTreeMap<String, f64>,
    pub brix: f64,
    pub status: i64,
    pub band: BrixBand,
    pub fruit: String,
    pub variety: String,
    pub batch_number: String,
    pub vendor_code: String,
    pub timestamp: DateTime<Utc>,
    /// `{warehouse}/{device}/{date}/{time}`, unique per record
    pub device_info: String,
}

impl BatchResult {
    pub fn new(
        key: &DeviceKey,
        raw_means: &[f64],
        reading_names: &[String],
        prediction: &Prediction,
        profile: &DeviceProfile,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let readings: Vec<f64> = raw_means
            .iter()
            .map(|v| if v.is_nan() { 0.0 } else { *v })
            .collect();
        let channels = reading_names
            .iter()
            .cloned()
            .zip(readings.iter().copied())
            .collect();

        Self {
            warehouse_id: key.warehouse_id.clone(),
            device_id: key.device_id.clone(),
            readings,
            channels,
            brix: prediction.brix,
            status: prediction.score,
            band: prediction.band,
            fruit: profile.fruit.clone(),
            variety: profile.variety.clone(),
            batch_number: profile.batch_number.clone(),
            vendor_code: profile.vendor_code.clone(),
            timestamp,
            device_info: device_info(key, timestamp),
        }
    }

    pub fn key(&self) -> DeviceKey {
        DeviceKey::new(self.warehouse_id.clone(), self.device_id.clone())
    }
}

/// `{warehouse}/{device}/{YYYY-MM-DD}/{HH:MM:SS.ffffff}`
pub fn device_info(key: &DeviceKey, timestamp: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}/{}",
        key.warehouse_id,
        key.device_id,
        timestamp.format("%Y-%m-%d"),
        timestamp.format("%H:%M:%S%.6f")
    )
}

/// Latest persisted status for a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub device_info: String,
    pub status: i64,
}

/// A later correction to a stored result's status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusAmendment {
    pub warehouse_id: String,
    pub device_id: String,
    pub device_info: String,
    pub status: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum JournalEntry {
    Result(BatchResult),
    StatusUpdate(StatusAmendment),
}

/// Stores batch results
pub trait ResultSink: Send + Sync {
    fn store(&self, record: &BatchResult) -> Result<(), SinkError>;
}

/// Reads and amends the latest status per device
pub trait StatusStore: Send + Sync {
    fn latest_status(&self, key: &DeviceKey) -> Result<Option<StatusRecord>, SinkError>;

    fn update_status(&self, key: &DeviceKey, device_info: &str, status: i64) -> Result<(), SinkError>;
}

/// Append-only JSON lines journal
pub struct JsonlResultSink {
    path: PathBuf,
    file: Mutex<File>,
    latest: Mutex<HashMap<DeviceKey, StatusRecord>>,
}

impl JsonlResultSink {
    /// Open (or create) the journal, rebuilding the latest-status index
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let latest = if path.exists() {
            rebuild_index(&path)?
        } else {
            HashMap::new()
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!(
            "Result journal {} opened ({} device(s) with history)",
            path.display(),
            latest.len()
        );

        Ok(Self {
            path,
            file: Mutex::new(file),
            latest: Mutex::new(latest),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, entry: &JournalEntry) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

fn rebuild_index(path: &Path) -> Result<HashMap<DeviceKey, StatusRecord>, SinkError> {
    let reader = BufReader::new(File::open(path)?);
    let mut latest = HashMap::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JournalEntry>(&line) {
            Ok(JournalEntry::Result(record)) => {
                latest.insert(
                    record.key(),
                    StatusRecord {
                        device_info: record.device_info,
                        status: record.status,
                    },
                );
            }
            Ok(JournalEntry::StatusUpdate(amendment)) => {
                let key = DeviceKey::new(amendment.warehouse_id, amendment.device_id);
                if let Some(current) = latest.get_mut(&key) {
                    if current.device_info == amendment.device_info {
                        current.status = amendment.status;
                    }
                }
            }
            Err(e) => warn!("Skipping unreadable journal line {}: {}", number + 1, e),
        }
    }

    Ok(latest)
}

impl ResultSink for JsonlResultSink {
    fn store(&self, record: &BatchResult) -> Result<(), SinkError> {
        self.append(&JournalEntry::Result(record.clone()))?;
        self.latest.lock().insert(
            record.key(),
            StatusRecord {
                device_info: record.device_info.clone(),
                status: record.status,
            },
        );
        Ok(())
    }
}

impl StatusStore for JsonlResultSink {
    fn latest_status(&self, key: &DeviceKey) -> Result<Option<StatusRecord>, SinkError> {
        Ok(self.latest.lock().get(key).cloned())
    }

    fn update_status(&self, key: &DeviceKey, device_info: &str, status: i64) -> Result<(), SinkError> {
        self.append(&JournalEntry::StatusUpdate(StatusAmendment {
            warehouse_id: key.warehouse_id.clone(),
            device_id: key.device_id.clone(),
            device_info: device_info.to_string(),
            status,
            timestamp: Utc::now(),
        }))?;

        if let Some(current) = self.latest.lock().get_mut(key) {
            if current.device_info == device_info {
                current.status = status;
            }
        }
        Ok(())
    }
}

/// In-memory sink, for embedding and tests
#[derive(Default)]
pub struct MemoryResultSink {
    records: Mutex<Vec<BatchResult>>,
}

impl MemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<BatchResult> {
        self.records.lock().clone()
    }
}

impl ResultSink for MemoryResultSink {
    fn store(&self, record: &BatchResult) -> Result<(), SinkError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

impl StatusStore for MemoryResultSink {
    fn latest_status(&self, key: &DeviceKey) -> Result<Option<StatusRecord>, SinkError> {
        Ok(self
            .records
            .lock()
            .iter()
            .rev()
            .find(|r| r.warehouse_id == key.warehouse_id && r.device_id == key.device_id)
            .map(|r| StatusRecord {
                device_info: r.device_info.clone(),
                status: r.status,
            }))
    }

    fn update_status(&self, _key: &DeviceKey, device_info: &str, status: i64) -> Result<(), SinkError> {
        if let Some(record) = self
            .records
            .lock()
            .iter_mut()
            .find(|r| r.device_info == device_info)
        {
            record.status = status;
        }
        Ok(())
    }
}
