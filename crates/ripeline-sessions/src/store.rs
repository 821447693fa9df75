// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Session store
//!
//! Single owner of every [`DeviceSession`]. Access is per-key: the map is
//! behind an `RwLock` that is only write-locked to insert a new device, and
//! each session has its own `Mutex`. Callers for different devices proceed
//! concurrently; callers for the same device are serialized.
//!
//! `parking_lot` locks do not poison, so a panic inside a caller's closure
//! releases the session lock and leaves the store usable.

use crate::session::{DeviceSession, SessionSnapshot};
use crate::types::DeviceKey;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Per-device session registry
pub struct SessionStore {
    sessions: RwLock<HashMap<DeviceKey, Arc<Mutex<DeviceSession>>>>,
    limit: usize,
}

impl SessionStore {
    /// Create an empty store; every session gets `limit` as its batch size
    pub fn new(limit: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run `f` with exclusive access to the session for `key`, creating it
    /// if this is the first time the device is seen
    pub fn with_session<R>(&self, key: &DeviceKey, f: impl FnOnce(&mut DeviceSession) -> R) -> R {
        let session = self.get_or_create(key);
        let mut guard = session.lock();
        f(&mut guard)
    }

    /// Run `f` on every known session in turn, each under its own lock
    ///
    /// The set of sessions is captured when iteration starts; devices first
    /// seen during the walk are picked up on the next call.
    pub fn for_each_session(&self, mut f: impl FnMut(&mut DeviceSession)) {
        let sessions: Vec<Arc<Mutex<DeviceSession>>> =
            self.sessions.read().values().cloned().collect();

        for session in sessions {
            let mut guard = session.lock();
            f(&mut guard);
        }
    }

    /// Copy of one session's state, if the device has been seen
    pub fn snapshot(&self, key: &DeviceKey) -> Option<SessionSnapshot> {
        let session = self.sessions.read().get(key).cloned()?;
        let guard = session.lock();
        Some(guard.snapshot())
    }

    /// Copies of all sessions, ordered by device key
    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        let mut snapshots = Vec::new();
        self.for_each_session(|session| snapshots.push(session.snapshot()));
        snapshots.sort_by(|a, b| a.key.cmp(&b.key));
        snapshots
    }

    /// Number of distinct devices seen
    pub fn device_count(&self) -> usize {
        self.sessions.read().len()
    }

    fn get_or_create(&self, key: &DeviceKey) -> Arc<Mutex<DeviceSession>> {
        if let Some(session) = self.sessions.read().get(key) {
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write();
        // Another caller may have inserted between the read and write locks
        Arc::clone(sessions.entry(key.clone()).or_insert_with(|| {
            info!("Session created for device {}", key);
            Arc::new(Mutex::new(DeviceSession::new(key.clone(), self.limit)))
        }))
    }
}
