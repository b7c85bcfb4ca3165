//! Tracker settings shared by every mounted instance

use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Default prefix for persisted course keys
pub const DEFAULT_KEY_PREFIX: &str = "course_time_";

/// Shortest timer period a tracker will run with
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Longest timer period a tracker will run with
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// How a resync reconciles the stored value with the in-memory counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Adopt whatever the store holds (last write wins)
    #[default]
    Adopt,
    /// Keep the larger of the stored and in-memory values
    Max,
}

impl MergePolicy {
    /// Value the counter should hold after a resync
    pub fn merge(self, in_memory: u64, stored: u64) -> u64 {
        match self {
            MergePolicy::Adopt => stored,
            MergePolicy::Max => in_memory.max(stored),
        }
    }
}

/// Timing and persistence settings for course trackers
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub key_prefix: String,
    pub tick_interval: Duration,
    /// Number of ticks between redundant flushes
    pub flush_every: u32,
    pub merge_policy: MergePolicy,
}

impl TrackerSettings {
    /// Storage key for a course
    pub fn storage_key(&self, course_id: &str) -> String {
        format!("{}{}", self.key_prefix, course_id)
    }

    /// Course id for a storage key, if the key belongs to this tracker
    pub fn course_id_from_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.key_prefix.as_str())
            .filter(|course_id| !course_id.is_empty())
    }

    /// Period of the tick timer, clamped to `MIN_INTERVAL..=MAX_INTERVAL`
    pub fn tick_period(&self) -> Duration {
        self.tick_interval.clamp(MIN_INTERVAL, MAX_INTERVAL)
    }

    /// Period of the redundant flush timer, capped at `MAX_INTERVAL`
    pub fn flush_interval(&self) -> Duration {
        self.tick_period()
            .checked_mul(self.flush_every.max(1))
            .map_or(MAX_INTERVAL, |period| period.min(MAX_INTERVAL))
    }
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            tick_interval: Duration::from_secs(1),
            flush_every: 10,
            merge_policy: MergePolicy::Adopt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_round_trip() {
        let settings = TrackerSettings::default();
        let key = settings.storage_key("rust-101");

        assert_eq!(key, "course_time_rust-101");
        assert_eq!(settings.course_id_from_key(&key), Some("rust-101"));
        assert_eq!(settings.course_id_from_key("theme"), None);
        assert_eq!(settings.course_id_from_key("course_time_"), None);
    }

    #[test]
    fn test_merge_policies() {
        assert_eq!(MergePolicy::Adopt.merge(50, 20), 20);
        assert_eq!(MergePolicy::Adopt.merge(20, 50), 50);
        assert_eq!(MergePolicy::Max.merge(50, 20), 50);
        assert_eq!(MergePolicy::Max.merge(20, 50), 50);
    }

    #[test]
    fn test_flush_interval() {
        let settings = TrackerSettings::default();
        assert_eq!(settings.flush_interval(), Duration::from_secs(10));

        let settings = TrackerSettings { flush_every: 0, ..TrackerSettings::default() };
        assert_eq!(settings.flush_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_periods_are_clamped() {
        let settings = TrackerSettings {
            tick_interval: Duration::MAX,
            flush_every: u32::MAX,
            ..TrackerSettings::default()
        };
        assert_eq!(settings.tick_period(), MAX_INTERVAL);
        assert_eq!(settings.flush_interval(), MAX_INTERVAL);

        let settings = TrackerSettings {
            tick_interval: Duration::from_secs(3600),
            flush_every: u32::MAX,
            ..TrackerSettings::default()
        };
        assert_eq!(settings.flush_interval(), MAX_INTERVAL);

        let settings = TrackerSettings { tick_interval: Duration::ZERO, ..TrackerSettings::default() };
        assert_eq!(settings.tick_period(), MIN_INTERVAL);
        assert_eq!(settings.flush_interval(), MIN_INTERVAL * 10);
    }
}
