//! Main application state management

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Instant,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use super::{HostError, LifecycleEvent, TrackerSnapshot};
use crate::{
    store::DurableStore,
    tasks::{tracker_task, TrackerCommand},
    tracker::{format_time, initialize, CourseTimer, TrackerSettings},
};

/// Persisted elapsed time for one course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseTime {
    pub course_id: String,
    pub elapsed_seconds: u64,
    pub formatted: String,
}

impl CourseTime {
    pub fn new(course_id: impl Into<String>, elapsed_seconds: u64) -> Self {
        Self {
            course_id: course_id.into(),
            elapsed_seconds,
            formatted: format_time(elapsed_seconds),
        }
    }
}

/// Host-side handle on a running tracker task
#[derive(Debug)]
struct TrackerHandle {
    commands: mpsc::Sender<TrackerCommand>,
    snapshot_rx: watch::Receiver<TrackerSnapshot>,
    task: JoinHandle<TrackerSnapshot>,
}

/// Main application state that owns the store and every mounted tracker
pub struct AppState {
    /// Durable store shared by all trackers
    pub store: Arc<dyn DurableStore>,
    pub settings: TrackerSettings,
    /// Mounted trackers by id
    trackers: Mutex<HashMap<u64, TrackerHandle>>,
    next_tracker_id: AtomicU64,
    /// Channel for page lifecycle broadcasts
    pub lifecycle_tx: broadcast::Sender<LifecycleEvent>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Mutex<Option<String>>,
    pub last_action_time: Mutex<Option<DateTime<Utc>>>,
}

impl AppState {
    /// Create a new AppState with no mounted trackers
    pub fn new(store: Arc<dyn DurableStore>, settings: TrackerSettings, port: u16, host: String) -> Self {
        let (lifecycle_tx, _) = broadcast::channel(64);

        Self {
            store,
            settings,
            trackers: Mutex::new(HashMap::new()),
            next_tracker_id: AtomicU64::new(1),
            lifecycle_tx,
            start_time: Instant::now(),
            port,
            host,
            last_action: Mutex::new(None),
            last_action_time: Mutex::new(None),
        }
    }

    fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    fn lock_trackers(&self) -> Result<std::sync::MutexGuard<'_, HashMap<u64, TrackerHandle>>, HostError> {
        self.trackers.lock()
            .map_err(|e| HostError::Lock(format!("Failed to lock tracker table: {}", e)))
    }

    fn validate_course_id(course_id: &str) -> Result<&str, HostError> {
        let trimmed = course_id.trim();
        if trimmed.is_empty() {
            return Err(HostError::InvalidCourseId(course_id.to_string()));
        }
        Ok(trimmed)
    }

    /// Mount a tracker for a course and start its timers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(&self, course_id: &str) -> Result<TrackerSnapshot, HostError> {
        let course_id = Self::validate_course_id(course_id)?;

        // Hold the table before spawning so every running task is reachable
        let mut trackers = self.lock_trackers()?;
        let tracker_id = self.next_tracker_id.fetch_add(1, Ordering::SeqCst);

        let mut timer = CourseTimer::new(Arc::clone(&self.store), self.settings.clone(), course_id);
        timer.activate();

        let mounted_at = Utc::now();
        let snapshot = TrackerSnapshot::new(tracker_id, timer.state(), mounted_at);
        let (snapshot_tx, snapshot_rx) = watch::channel(snapshot.clone());
        let (command_tx, command_rx) = mpsc::channel(16);
        let lifecycle_rx = self.lifecycle_tx.subscribe();

        let task = tokio::spawn(tracker_task(
            tracker_id,
            timer,
            mounted_at,
            lifecycle_rx,
            command_rx,
            snapshot_tx,
        ));

        trackers.insert(tracker_id, TrackerHandle {
            commands: command_tx,
            snapshot_rx,
            task,
        });
        drop(trackers);

        info!("Mounted tracker {} for course {} at {}", tracker_id, course_id, snapshot.formatted);
        self.record_action("mount");
        Ok(snapshot)
    }

    /// Unmount a tracker, waiting for its final flush
    pub async fn unmount(&self, tracker_id: u64) -> Result<TrackerSnapshot, HostError> {
        let handle = self.lock_trackers()?
            .remove(&tracker_id)
            .ok_or(HostError::TrackerNotFound(tracker_id))?;

        let snapshot = Self::stop(tracker_id, handle).await?;
        info!("Unmounted tracker {} for course {} at {}", tracker_id, snapshot.course_id, snapshot.formatted);
        self.record_action("unmount");
        Ok(snapshot)
    }

    async fn stop(tracker_id: u64, handle: TrackerHandle) -> Result<TrackerSnapshot, HostError> {
        if handle.commands.send(TrackerCommand::Unmount).await.is_err() {
            debug!("Tracker {} already stopped before unmount", tracker_id);
        }
        handle.task.await
            .map_err(|e| HostError::TrackerFailed(tracker_id, e.to_string()))
    }

    /// Unmount every tracker. Used on shutdown.
    pub async fn unmount_all(&self) -> Vec<TrackerSnapshot> {
        let handles: Vec<(u64, TrackerHandle)> = match self.lock_trackers() {
            Ok(mut trackers) => trackers.drain().collect(),
            Err(e) => {
                warn!("Failed to drain trackers: {}", e);
                return Vec::new();
            }
        };

        let mut snapshots = Vec::with_capacity(handles.len());
        for (tracker_id, handle) in handles {
            match Self::stop(tracker_id, handle).await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => warn!("Failed to unmount tracker {}: {}", tracker_id, e),
            }
        }

        if !snapshots.is_empty() {
            info!("Unmounted {} trackers", snapshots.len());
        }
        snapshots
    }

    /// Report a navigation change to a tracker, optionally to another course
    pub async fn navigate(&self, tracker_id: u64, course_id: Option<&str>) -> Result<TrackerSnapshot, HostError> {
        let course_id = course_id.map(Self::validate_course_id).transpose()?;
        let commands = self.lock_trackers()?
            .get(&tracker_id)
            .map(|handle| handle.commands.clone())
            .ok_or(HostError::TrackerNotFound(tracker_id))?;

        let (reply, reply_rx) = oneshot::channel();
        commands
            .send(TrackerCommand::Navigate { course_id: course_id.map(str::to_string), reply })
            .await
            .map_err(|_| HostError::TrackerNotFound(tracker_id))?;
        // A dropped reply means the task stopped before reaching the request
        let snapshot = reply_rx.await
            .map_err(|_| HostError::TrackerNotFound(tracker_id))?;

        self.record_action("navigate");
        Ok(snapshot)
    }

    /// Broadcast a lifecycle event to every mounted tracker.
    ///
    /// Returns the number of trackers that will receive it.
    pub fn broadcast(&self, event: LifecycleEvent) -> usize {
        self.record_action(event.as_str());
        match self.lifecycle_tx.send(event) {
            Ok(receivers) => {
                debug!("Lifecycle event {} sent to {} trackers", event.as_str(), receivers);
                receivers
            }
            Err(_) => {
                debug!("Lifecycle event {} sent with no trackers mounted", event.as_str());
                0
            }
        }
    }

    /// Page visibility changed
    pub fn set_visibility(&self, hidden: bool) -> usize {
        self.broadcast(if hidden {
            LifecycleEvent::VisibilityHidden
        } else {
            LifecycleEvent::VisibilityVisible
        })
    }

    /// Page is unloading
    pub fn unload(&self) -> usize {
        self.broadcast(LifecycleEvent::Unload)
    }

    /// Latest snapshot of a mounted tracker
    pub fn snapshot(&self, tracker_id: u64) -> Result<TrackerSnapshot, HostError> {
        self.lock_trackers()?
            .get(&tracker_id)
            .map(|handle| handle.snapshot_rx.borrow().clone())
            .ok_or(HostError::TrackerNotFound(tracker_id))
    }

    /// Snapshots of every mounted tracker, ordered by id
    pub fn list_trackers(&self) -> Result<Vec<TrackerSnapshot>, HostError> {
        let mut snapshots: Vec<TrackerSnapshot> = self.lock_trackers()?
            .values()
            .map(|handle| handle.snapshot_rx.borrow().clone())
            .collect();
        snapshots.sort_by_key(|s| s.tracker_id);
        Ok(snapshots)
    }

    pub fn active_tracker_count(&self) -> usize {
        self.lock_trackers().map(|t| t.len()).unwrap_or(0)
    }

    /// Persisted time for a course, read the same way a mounting tracker does
    pub fn persisted_time(&self, course_id: &str) -> Result<CourseTime, HostError> {
        let course_id = Self::validate_course_id(course_id)?;
        let seconds = initialize(self.store.as_ref(), &self.settings.storage_key(course_id));
        Ok(CourseTime::new(course_id, seconds))
    }

    /// Every course with a persisted counter, ordered by course id
    pub fn list_persisted(&self) -> Result<Vec<CourseTime>, HostError> {
        let mut courses: Vec<CourseTime> = self.store.keys()?
            .iter()
            .filter_map(|key| self.settings.course_id_from_key(key))
            .map(|course_id| {
                let seconds = initialize(self.store.as_ref(), &self.settings.storage_key(course_id));
                CourseTime::new(course_id, seconds)
            })
            .collect();
        courses.sort_by(|a, b| a.course_id.cmp(&b.course_id));
        Ok(courses)
    }

    /// Remove the persisted counter for a course.
    ///
    /// Mounted trackers for the course keep their in-memory value and write
    /// it back on their next tick.
    pub fn clear_course(&self, course_id: &str) -> Result<(), HostError> {
        let course_id = Self::validate_course_id(course_id)?;
        self.store.remove(&self.settings.storage_key(course_id))?;
        info!("Cleared persisted time for course {}", course_id);
        self.record_action("clear");
        Ok(())
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    use crate::{
        state::TrackerPhase,
        store::{testing::RecordingStore, MemoryStore},
        tracker::MergePolicy,
    };

    fn app_with(store: Arc<dyn DurableStore>) -> AppState {
        AppState::new(store, TrackerSettings::default(), 0, "127.0.0.1".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_tick_unmount() {
        let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
        store.set("course_time_rust-101", "42").unwrap();
        let app = app_with(Arc::clone(&store));

        let mounted = app.mount("rust-101").unwrap();
        assert_eq!(mounted.elapsed_seconds, 42);
        assert_eq!(mounted.phase, TrackerPhase::Active);
        assert_eq!(app.active_tracker_count(), 1);

        sleep(Duration::from_millis(3_500)).await;
        assert_eq!(app.snapshot(mounted.tracker_id).unwrap().elapsed_seconds, 45);

        let last = app.unmount(mounted.tracker_id).await.unwrap();
        assert_eq!(last.elapsed_seconds, 45);
        assert_eq!(last.phase, TrackerPhase::Inactive);
        assert_eq!(store.get("course_time_rust-101").unwrap().as_deref(), Some("45"));
        assert_eq!(app.active_tracker_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_mounts_accumulate() {
        let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
        let app = app_with(store);

        let first = app.mount("a").unwrap();
        assert_eq!(first.elapsed_seconds, 0);
        sleep(Duration::from_millis(4_500)).await;
        assert_eq!(app.unmount(first.tracker_id).await.unwrap().elapsed_seconds, 4);

        let second = app.mount("a").unwrap();
        assert_eq!(second.elapsed_seconds, 4);
        sleep(Duration::from_millis(2_500)).await;
        assert_eq!(app.unmount(second.tracker_id).await.unwrap().elapsed_seconds, 6);

        assert_eq!(app.persisted_time("a").unwrap().elapsed_seconds, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_instances_last_write_wins() {
        let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
        store.set("course_time_a", "100").unwrap();
        let app = app_with(Arc::clone(&store));

        let first = app.mount("a").unwrap();
        sleep(Duration::from_millis(5_500)).await;

        // Second tab: starts from whatever the first one last wrote
        let second = app.mount("a").unwrap();
        assert_eq!(second.elapsed_seconds, 105);
        assert_ne!(first.tracker_id, second.tracker_id);

        // First ticks at 6s and 7s, second at 6.5s
        sleep(Duration::from_millis(1_800)).await;
        let first_last = app.unmount(first.tracker_id).await.unwrap();
        assert_eq!(first_last.elapsed_seconds, 107);

        // The later final flush overwrites the larger value
        let second_last = app.unmount(second.tracker_id).await.unwrap();
        assert_eq!(second_last.elapsed_seconds, 106);
        assert_eq!(store.get("course_time_a").unwrap().as_deref(), Some("106"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_resync_adopts_other_writer() {
        let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
        let app = app_with(Arc::clone(&store));

        let mounted = app.mount("a").unwrap();
        sleep(Duration::from_millis(1_500)).await;

        let snapshot = app.navigate(mounted.tracker_id, Some("b")).await.unwrap();
        assert_eq!(snapshot.course_id, "b");
        assert_eq!(snapshot.elapsed_seconds, 0);
        assert_eq!(app.persisted_time("a").unwrap().elapsed_seconds, 1);

        store.set("course_time_b", "30").unwrap();
        let snapshot = app.navigate(mounted.tracker_id, None).await.unwrap();
        assert_eq!(snapshot.course_id, "b");
        assert_eq!(snapshot.elapsed_seconds, 30);

        store.set("course_time_b", "10").unwrap();
        let snapshot = app.navigate(mounted.tracker_id, Some("b")).await.unwrap();
        assert_eq!(snapshot.elapsed_seconds, 10);

        app.unmount(mounted.tracker_id).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_merge_policy_keeps_larger_value() {
        let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
        let settings = TrackerSettings { merge_policy: MergePolicy::Max, ..TrackerSettings::default() };
        let app = AppState::new(Arc::clone(&store), settings, 0, "127.0.0.1".to_string());

        let mounted = app.mount("a").unwrap();
        sleep(Duration::from_millis(3_500)).await;

        store.set("course_time_a", "1").unwrap();
        let snapshot = app.navigate(mounted.tracker_id, None).await.unwrap();
        assert_eq!(snapshot.elapsed_seconds, 3);
        assert_eq!(store.get("course_time_a").unwrap().as_deref(), Some("3"));

        store.set("course_time_a", "500").unwrap();
        let snapshot = app.navigate(mounted.tracker_id, None).await.unwrap();
        assert_eq!(snapshot.elapsed_seconds, 500);

        app.unmount(mounted.tracker_id).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_broadcast_flushes_all_trackers() {
        let store = Arc::new(RecordingStore::new());
        let app = app_with(store.clone());

        assert_eq!(app.unload(), 0);

        app.mount("a").unwrap();
        app.mount("b").unwrap();

        assert_eq!(app.set_visibility(true), 2);
        sleep(Duration::from_millis(100)).await;
        assert_eq!(store.writes(), 2);

        assert_eq!(app.set_visibility(false), 2);
        sleep(Duration::from_millis(100)).await;
        assert_eq!(store.writes(), 2);

        let (last_action, last_time) = app.get_last_action();
        assert_eq!(last_action.as_deref(), Some("visibility_visible"));
        assert!(last_time.is_some());

        let snapshots = app.unmount_all().await;
        assert_eq!(snapshots.len(), 2);
        assert_eq!(app.active_tracker_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_requests() {
        let app = app_with(Arc::new(MemoryStore::new()));

        assert!(matches!(app.mount("   "), Err(HostError::InvalidCourseId(_))));
        assert!(matches!(app.unmount(99).await, Err(HostError::TrackerNotFound(99))));
        assert!(matches!(app.navigate(99, None).await, Err(HostError::TrackerNotFound(99))));
        assert!(matches!(app.snapshot(99), Err(HostError::TrackerNotFound(99))));
        assert!(matches!(app.persisted_time(""), Err(HostError::InvalidCourseId(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_with_poisoned_table_spawns_nothing() {
        let store = Arc::new(RecordingStore::new());
        let app = app_with(store.clone());

        let poison = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = app.trackers.lock().unwrap();
            panic!("poison tracker table");
        }));
        assert!(poison.is_err());

        assert!(matches!(app.mount("a"), Err(HostError::Lock(_))));

        sleep(Duration::from_millis(3_500)).await;
        assert_eq!(store.writes(), 0);
        assert_eq!(store.get("course_time_a").unwrap(), None);
    }

    #[tokio::test]
    async fn test_navigate_queued_behind_unmount_is_not_found() {
        let app = app_with(Arc::new(MemoryStore::new()));
        let mounted = app.mount("a").unwrap();

        let commands = app.trackers.lock().unwrap()
            .get(&mounted.tracker_id)
            .map(|handle| handle.commands.clone())
            .unwrap();
        commands.send(TrackerCommand::Unmount).await.unwrap();

        let result = app.navigate(mounted.tracker_id, Some("b")).await;
        assert!(matches!(result, Err(HostError::TrackerNotFound(id)) if id == mounted.tracker_id));
    }

    #[test]
    fn test_list_and_clear_persisted() {
        let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
        store.set("course_time_b", "61").unwrap();
        store.set("course_time_a", "oops").unwrap();
        store.set("theme", "dark").unwrap();
        let app = app_with(Arc::clone(&store));

        let courses = app.list_persisted().unwrap();
        assert_eq!(courses, vec![CourseTime::new("a", 0), CourseTime::new("b", 61)]);
        assert_eq!(courses[1].formatted, "00:01:01");

        app.clear_course("b").unwrap();
        assert_eq!(app.persisted_time("b").unwrap().elapsed_seconds, 0);
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
    }
}
