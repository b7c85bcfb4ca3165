//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod error;
pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/trackers", post(mount_handler).get(list_trackers_handler))
        .route("/trackers/:tracker_id", get(tracker_handler).delete(unmount_handler))
        .route("/trackers/:tracker_id/navigate", post(navigate_handler))
        .route("/page/hidden", post(page_hidden_handler))
        .route("/page/visible", post(page_visible_handler))
        .route("/page/unload", post(page_unload_handler))
        .route("/courses", get(list_courses_handler))
        .route(
            "/courses/:course_id/time",
            get(course_time_handler).delete(clear_course_handler),
        )
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
