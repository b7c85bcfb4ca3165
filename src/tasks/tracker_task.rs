//! Tracker background task
//!
//! One task per mounted tracker. It owns the `CourseTimer`, so every
//! mutation of the counter happens on this task and ticks are strictly
//! sequential.

use chrono::{DateTime, Utc};
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    state::{LifecycleEvent, TrackerSnapshot},
    tracker::CourseTimer,
};

/// Requests sent from the host to a running tracker task
#[derive(Debug)]
pub enum TrackerCommand {
    /// Navigation context changed, optionally to another course
    Navigate {
        course_id: Option<String>,
        reply: oneshot::Sender<TrackerSnapshot>,
    },
    /// Stop the timers, flush and exit
    Unmount,
}

/// Drive an already activated `CourseTimer` until it is unmounted.
///
/// Returns the final snapshot after the closing flush. Closing the command
/// channel or the lifecycle bus is treated as an unmount.
pub async fn tracker_task(
    tracker_id: u64,
    mut timer: CourseTimer,
    mounted_at: DateTime<Utc>,
    mut lifecycle_rx: broadcast::Receiver<LifecycleEvent>,
    mut commands: mpsc::Receiver<TrackerCommand>,
    snapshot_tx: watch::Sender<TrackerSnapshot>,
) -> TrackerSnapshot {
    info!("Starting tracker task {} for course {}", tracker_id, timer.course_id());

    let publish = |timer: &CourseTimer| {
        let snapshot = TrackerSnapshot::new(tracker_id, timer.state(), mounted_at);
        snapshot_tx.send_replace(snapshot.clone());
        snapshot
    };

    {
        let tick_period = timer.settings().tick_period();
        let flush_period = timer.settings().flush_interval();

        // Neither timer fires at mount time
        let mut tick = interval_at(Instant::now() + tick_period, tick_period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut flush = interval_at(Instant::now() + flush_period, flush_period);
        flush.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    timer.tick();
                    publish(&timer);
                }

                _ = flush.tick() => {
                    debug!("Periodic flush for tracker {}", tracker_id);
                    timer.flush();
                }

                event = lifecycle_rx.recv() => {
                    match event {
                        Ok(event) if event.requires_flush() => {
                            debug!("Tracker {} flushing on {}", tracker_id, event.as_str());
                            timer.flush();
                        }
                        Ok(event) => {
                            debug!("Tracker {} ignoring {}", tracker_id, event.as_str());
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Tracker {} missed {} lifecycle events, flushing", tracker_id, skipped);
                            timer.flush();
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("Lifecycle bus closed, stopping tracker {}", tracker_id);
                            break;
                        }
                    }
                }

                command = commands.recv() => {
                    match command {
                        Some(TrackerCommand::Navigate { course_id, reply }) => {
                            timer.navigate(course_id.as_deref());
                            let snapshot = publish(&timer);
                            if reply.send(snapshot).is_err() {
                                debug!("Navigate caller for tracker {} went away", tracker_id);
                            }
                        }
                        Some(TrackerCommand::Unmount) | None => break,
                    }
                }
            }
        }
        // Both intervals are dropped here, before the final flush
    }

    timer.deactivate();
    let snapshot = publish(&timer);
    info!(
        "Tracker task {} stopped, course {} at {}",
        tracker_id, snapshot.course_id, snapshot.formatted
    );
    snapshot
}
