//! Host page lifecycle signals

use serde::{Deserialize, Serialize};

/// Page-level signal delivered to every mounted tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The page is going away
    Unload,
    /// The page moved to the background
    VisibilityHidden,
    /// The page came back to the foreground
    VisibilityVisible,
}

impl LifecycleEvent {
    /// Whether trackers must flush when they see this event
    pub fn requires_flush(self) -> bool {
        matches!(self, LifecycleEvent::Unload | LifecycleEvent::VisibilityHidden)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleEvent::Unload => "unload",
            LifecycleEvent::VisibilityHidden => "visibility_hidden",
            LifecycleEvent::VisibilityVisible => "visibility_visible",
        }
    }
}
