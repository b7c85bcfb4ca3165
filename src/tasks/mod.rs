//! Background tasks module
//!
//! This module contains the per-tracker task that runs the tick and flush
//! timers alongside the HTTP server.

pub mod tracker_task;

// Re-export main items
pub use tracker_task::{tracker_task, TrackerCommand};
