//! Course Timer - per-course elapsed time tracking service
//!
//! This is the main entry point for the course-timer application.

use std::sync::Arc;
use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use course_timer::{
    config::Config,
    state::AppState,
    store::{DurableStore, FileStore, MemoryStore},
    api::create_router,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("course_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting course-timer server v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn DurableStore> = match &config.store {
        Some(path) => Arc::new(
            FileStore::open(path)
                .with_context(|| format!("Failed to open store at {}", path.display()))?,
        ),
        None => Arc::new(MemoryStore::new()),
    };

    let settings = config.tracker_settings();
    info!(
        "Configuration: host={}, port={}, store={}, tick={}ms, flush every {} ticks, merge={:?}",
        config.host, config.port, store.describe(), config.tick_ms, settings.flush_every, settings.merge_policy
    );

    // Create application state
    let state = Arc::new(AppState::new(store, settings, config.port, config.host.clone()));

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST   /trackers                - Mount a tracker for a course");
    info!("  GET    /trackers                - List mounted trackers");
    info!("  GET    /trackers/:id            - Tracker snapshot");
    info!("  DELETE /trackers/:id            - Unmount a tracker (final flush)");
    info!("  POST   /trackers/:id/navigate   - Navigation context changed");
    info!("  POST   /page/hidden|visible|unload - Page lifecycle signals");
    info!("  GET    /courses                 - Persisted course totals");
    info!("  GET    /courses/:id/time        - Persisted total for a course");
    info!("  DELETE /courses/:id/time        - Clear a persisted total");
    info!("  GET    /status                  - Service status");
    info!("  GET    /health                  - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // Treat shutdown as a page unload, then tear every tracker down
    state.unload();
    let flushed = state.unmount_all().await;
    info!("Flushed {} trackers", flushed.len());

    info!("Server shutdown complete");
    Ok(())
}
