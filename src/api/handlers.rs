//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::info;

use crate::state::{AppState, CourseTime, LifecycleEvent, TrackerSnapshot};
use super::{
    error::ApiResult,
    responses::{HealthResponse, LifecycleResponse, MountRequest, NavigateRequest, StatusResponse},
};

/// Handle POST /trackers - Mount a tracker for a course
pub async fn mount_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MountRequest>,
) -> ApiResult<(StatusCode, Json<TrackerSnapshot>)> {
    let snapshot = state.mount(&request.course_id)?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Handle GET /trackers - List mounted trackers
pub async fn list_trackers_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<TrackerSnapshot>>> {
    Ok(Json(state.list_trackers()?))
}

/// Handle GET /trackers/:id - Current snapshot of one tracker
pub async fn tracker_handler(
    State(state): State<Arc<AppState>>,
    Path(tracker_id): Path<u64>,
) -> ApiResult<Json<TrackerSnapshot>> {
    Ok(Json(state.snapshot(tracker_id)?))
}

/// Handle DELETE /trackers/:id - Unmount a tracker after its final flush
pub async fn unmount_handler(
    State(state): State<Arc<AppState>>,
    Path(tracker_id): Path<u64>,
) -> ApiResult<Json<TrackerSnapshot>> {
    Ok(Json(state.unmount(tracker_id).await?))
}

/// Handle POST /trackers/:id/navigate - Navigation context changed
///
/// An empty body means the course did not change. Any other body must be a
/// valid `NavigateRequest`.
pub async fn navigate_handler(
    State(state): State<Arc<AppState>>,
    Path(tracker_id): Path<u64>,
    body: Bytes,
) -> ApiResult<Json<TrackerSnapshot>> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        NavigateRequest::default()
    } else {
        let Json(request) = Json::<NavigateRequest>::from_bytes(&body)?;
        request
    };
    let snapshot = state.navigate(tracker_id, request.course_id.as_deref()).await?;
    Ok(Json(snapshot))
}

fn lifecycle(state: &AppState, event: LifecycleEvent) -> Json<LifecycleResponse> {
    let notified = state.broadcast(event);
    info!("Page {} signal delivered to {} trackers", event.as_str(), notified);
    Json(LifecycleResponse::new(event, notified))
}

/// Handle POST /page/hidden
pub async fn page_hidden_handler(State(state): State<Arc<AppState>>) -> Json<LifecycleResponse> {
    lifecycle(&state, LifecycleEvent::VisibilityHidden)
}

/// Handle POST /page/visible
pub async fn page_visible_handler(State(state): State<Arc<AppState>>) -> Json<LifecycleResponse> {
    lifecycle(&state, LifecycleEvent::VisibilityVisible)
}

/// Handle POST /page/unload
pub async fn page_unload_handler(State(state): State<Arc<AppState>>) -> Json<LifecycleResponse> {
    lifecycle(&state, LifecycleEvent::Unload)
}

/// Handle GET /courses - Every persisted course total
pub async fn list_courses_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<CourseTime>>> {
    Ok(Json(state.list_persisted()?))
}

/// Handle GET /courses/:course_id/time - Persisted total for one course
pub async fn course_time_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> ApiResult<Json<CourseTime>> {
    Ok(Json(state.persisted_time(&course_id)?))
}

/// Handle DELETE /courses/:course_id/time - Clear a persisted total
pub async fn clear_course_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.clear_course(&course_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handle GET /status - Return current service status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        active_trackers: state.active_tracker_count(),
        store: state.store.describe(),
        key_prefix: state.settings.key_prefix.clone(),
        tick_interval_ms: state.settings.tick_period().as_millis() as u64,
        flush_every: state.settings.flush_every,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
