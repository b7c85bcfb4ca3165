//! Timer state structure and snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tracker::format_time;

/// Whether a tracker instance is mounted and counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerPhase {
    Active,
    Inactive,
}

/// Elapsed time for one course, as held in memory by a tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub course_id: String,
    pub elapsed_seconds: u64,
    pub phase: TrackerPhase,
}

impl TimerState {
    /// Create an inactive timer state for a course
    pub fn new(course_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            elapsed_seconds: 0,
            phase: TrackerPhase::Inactive,
        }
    }

    /// Check if the timer is active
    pub fn is_active(&self) -> bool {
        self.phase == TrackerPhase::Active
    }

    /// Elapsed time as `HH:MM:SS`
    pub fn formatted(&self) -> String {
        format_time(self.elapsed_seconds)
    }
}

/// Point-in-time view of a mounted tracker, published after every change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    pub tracker_id: u64,
    pub course_id: String,
    pub elapsed_seconds: u64,
    pub formatted: String,
    pub phase: TrackerPhase,
    pub mounted_at: DateTime<Utc>,
}

impl TrackerSnapshot {
    pub fn new(tracker_id: u64, timer: &TimerState, mounted_at: DateTime<Utc>) -> Self {
        Self {
            tracker_id,
            course_id: timer.course_id.clone(),
            elapsed_seconds: timer.elapsed_seconds,
            formatted: timer.formatted(),
            phase: timer.phase,
            mounted_at,
        }
    }
}
