//! Course Timer - per-course elapsed time tracking with durable persistence
//!
//! This library counts the seconds a learner spends in each course, writes
//! every tick through to a durable key-value store, and re-hydrates the
//! counter whenever a course view mounts a tracker again.

pub mod config;
pub mod state;
pub mod store;
pub mod api;
pub mod tasks;
pub mod tracker;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use state::AppState;
pub use api::create_router;
pub use store::{DurableStore, FileStore, MemoryStore};
pub use tracker::{format_time, CourseTimer, TrackerSettings};
pub use utils::signals::shutdown_signal;
