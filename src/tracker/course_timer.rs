//! Per-course elapsed time counter with write-through persistence
//!
//! `CourseTimer` is the synchronous core of a tracker instance. It holds the
//! in-memory counter for one course and mirrors it into the durable store.
//! Scheduling lives in `tasks::tracker_task`; nothing here sleeps or spawns.
//!
//! Store failures never escape this type. They are logged and the counter
//! keeps going, so the next write-through acts as the retry.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::TrackerSettings;
use crate::{
    state::{TimerState, TrackerPhase},
    store::DurableStore,
};

/// Parse a persisted counter. Anything but a plain non-negative integer is `None`.
pub fn parse_elapsed(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

/// Read the persisted counter stored under `key`.
///
/// Missing keys, malformed values and store failures all read as `0`.
pub fn initialize(store: &dyn DurableStore, key: &str) -> u64 {
    match store.get(key) {
        Ok(Some(raw)) => parse_elapsed(&raw).unwrap_or_else(|| {
            debug!("Ignoring malformed value {:?} under {}", raw, key);
            0
        }),
        Ok(None) => 0,
        Err(e) => {
            warn!("Failed to read {}: {}", key, e);
            0
        }
    }
}

/// Elapsed time counter for one mounted course view
pub struct CourseTimer {
    store: Arc<dyn DurableStore>,
    settings: TrackerSettings,
    state: TimerState,
}

impl CourseTimer {
    /// Create an inactive timer for `course_id`
    pub fn new(store: Arc<dyn DurableStore>, settings: TrackerSettings, course_id: impl Into<String>) -> Self {
        Self {
            store,
            settings,
            state: TimerState::new(course_id),
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn course_id(&self) -> &str {
        &self.state.course_id
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.state.elapsed_seconds
    }

    pub fn phase(&self) -> TrackerPhase {
        self.state.phase
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    fn key(&self) -> String {
        self.settings.storage_key(&self.state.course_id)
    }

    /// Mount: load the persisted counter and start accepting ticks
    pub fn activate(&mut self) -> u64 {
        self.state.elapsed_seconds = initialize(self.store.as_ref(), &self.key());
        self.state.phase = TrackerPhase::Active;
        info!(
            "Tracker active for course {} at {}s",
            self.state.course_id, self.state.elapsed_seconds
        );
        self.state.elapsed_seconds
    }

    /// Count one second and write it through. No-op while inactive.
    pub fn tick(&mut self) -> u64 {
        if !self.state.is_active() {
            return self.state.elapsed_seconds;
        }
        self.state.elapsed_seconds = self.state.elapsed_seconds.saturating_add(1);
        self.persist();
        self.state.elapsed_seconds
    }

    /// Write the current counter to the store. No-op while inactive.
    pub fn flush(&self) {
        if self.state.is_active() {
            self.persist();
        }
    }

    /// Re-read the store and reconcile with the in-memory counter.
    ///
    /// Returns `true` when the counter changed.
    pub fn resync(&mut self) -> bool {
        let key = self.key();
        let stored = match self.store.get(&key) {
            Ok(Some(raw)) => parse_elapsed(&raw).unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                warn!("Resync of {} skipped, read failed: {}", key, e);
                return false;
            }
        };

        if stored == self.state.elapsed_seconds {
            return false;
        }

        let merged = self.settings.merge_policy.merge(self.state.elapsed_seconds, stored);
        debug!(
            "Resync {}: memory={} stored={} -> {}",
            key, self.state.elapsed_seconds, stored, merged
        );
        let changed = merged != self.state.elapsed_seconds;
        self.state.elapsed_seconds = merged;
        changed
    }

    /// Handle a navigation change.
    ///
    /// Moving to another course flushes the current value under the old key
    /// and loads the new course's persisted counter. Staying on the same
    /// course resyncs from the store and then flushes the reconciled value.
    pub fn navigate(&mut self, course_id: Option<&str>) {
        match course_id {
            Some(next) if next != self.state.course_id => {
                self.flush();
                info!("Tracker switching from course {} to {}", self.state.course_id, next);
                self.state.course_id = next.to_string();
                self.state.elapsed_seconds = if self.state.is_active() {
                    initialize(self.store.as_ref(), &self.key())
                } else {
                    0
                };
            }
            _ => {
                if self.state.is_active() {
                    self.resync();
                    self.flush();
                }
            }
        }
    }

    /// Unmount: final flush, then stop accepting ticks
    pub fn deactivate(&mut self) -> u64 {
        self.flush();
        self.state.phase = TrackerPhase::Inactive;
        info!(
            "Tracker inactive for course {} at {}s",
            self.state.course_id, self.state.elapsed_seconds
        );
        self.state.elapsed_seconds
    }

    fn persist(&self) {
        let key = self.key();
        if let Err(e) = self.store.set(&key, &self.state.elapsed_seconds.to_string()) {
            warn!("Failed to persist {}: {}", key, e);
        }
    }
}
