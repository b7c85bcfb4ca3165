//! Course elapsed-time tracker module
//!
//! This module contains the counter, its settings and the time formatter.

pub mod course_timer;
pub mod format;
pub mod settings;

// Re-export main types
pub use course_timer::{initialize, parse_elapsed, CourseTimer};
pub use format::format_time;
pub use settings::{MergePolicy, TrackerSettings, DEFAULT_KEY_PREFIX, MAX_INTERVAL, MIN_INTERVAL};
