//! State management module
//!
//! This module contains the tracker host state, per-course timer state and
//! the lifecycle events passed between them.

pub mod app_state;
pub mod error;
pub mod lifecycle;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, CourseTime};
pub use error::HostError;
pub use lifecycle::LifecycleEvent;
pub use timer_state::{TimerState, TrackerPhase, TrackerSnapshot};
