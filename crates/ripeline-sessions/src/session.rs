// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Per-device session state
//!
//! A session moves IDLE -> ACCUMULATING -> (DISPATCHING | evicted) -> IDLE.
//! DISPATCHING only exists while the owning lock is held: the batch is taken
//! and the session reset in one step, so no caller ever observes it.

use crate::types::{DeviceKey, Reading};
use std::time::Instant;

/// Observable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No readings since the last reset
    Idle,
    /// At least one reading, batch not yet complete
    Accumulating,
}

/// Accumulation state for one device
#[derive(Debug)]
pub struct DeviceSession {
    key: DeviceKey,
    feedback_topic: String,
    readings: Vec<Reading>,
    count: usize,
    limit: usize,
    first_reading_at: Option<Instant>,
    deadline: Option<Instant>,
}

impl DeviceSession {
    pub(crate) fn new(key: DeviceKey, limit: usize) -> Self {
        let feedback_topic = key.feedback_topic();
        Self {
            key,
            feedback_topic,
            readings: Vec::with_capacity(limit),
            count: 0,
            limit,
            first_reading_at: None,
            deadline: None,
        }
    }

    pub fn key(&self) -> &DeviceKey {
        &self.key
    }

    pub fn feedback_topic(&self) -> &str {
        &self.feedback_topic
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn first_reading_at(&self) -> Option<Instant> {
        self.first_reading_at
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn state(&self) -> SessionState {
        if self.count == 0 {
            SessionState::Idle
        } else {
            SessionState::Accumulating
        }
    }

    pub fn is_complete(&self) -> bool {
        self.count >= self.limit
    }

    /// Append a reading in arrival order; returns the new count
    ///
    /// Records `first_reading_at` on the 0 -> 1 transition. The deadline is
    /// left for the timeout supervisor to assign.
    pub(crate) fn append(&mut self, reading: Reading, now: Instant) -> usize {
        if self.count == 0 {
            self.first_reading_at = Some(now);
        }
        self.readings.push(reading);
        self.count += 1;
        debug_assert_eq!(self.readings.len(), self.count);
        self.count
    }

    pub(crate) fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    /// Take the accumulated readings and reset in one step
    pub(crate) fn take_batch(&mut self) -> Vec<Reading> {
        let batch = std::mem::replace(&mut self.readings, Vec::with_capacity(self.limit));
        self.clear_counters();
        batch
    }

    /// Reset to IDLE. Returns false if the session was already idle.
    pub(crate) fn reset(&mut self) -> bool {
        if self.count == 0 && self.deadline.is_none() {
            return false;
        }
        self.readings.clear();
        self.clear_counters();
        true
    }

    fn clear_counters(&mut self) {
        self.count = 0;
        self.first_reading_at = None;
        self.deadline = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            key: self.key.clone(),
            feedback_topic: self.feedback_topic.clone(),
            readings: self.readings.clone(),
            count: self.count,
            limit: self.limit,
            first_reading_at: self.first_reading_at,
            deadline: self.deadline,
            state: self.state(),
        }
    }
}

/// Read-only copy of a session taken under its lock
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub key: DeviceKey,
    pub feedback_topic: String,
    pub readings: Vec<Reading>,
    pub count: usize,
    pub limit: usize,
    pub first_reading_at: Option<Instant>,
    pub deadline: Option<Instant>,
    pub state: SessionState,
}

impl SessionSnapshot {
    /// True when the session holds nothing: count 0, no readings, no deadline
    pub fn is_empty(&self) -> bool {
        self.count == 0 && self.readings.is_empty() && self.deadline.is_none()
    }
}
