use std::sync::Arc;

use cortexa_core::scripting::gaze::GazeWorker;

use crate::config::ServerConfig;
use crate::live_sessions::LiveSessions;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: cortexa_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Centralized event bus for publishing platform events.
    pub event_bus: Arc<cortexa_events::EventBus>,
    /// Running social-attention tests.
    pub live_sessions: Arc<LiveSessions>,
    /// Gaze worker, when one is configured.
    pub gaze_worker: Option<Arc<GazeWorker>>,
}

impl AppState {
    pub fn new(
        pool: cortexa_db::DbPool,
        config: ServerConfig,
        event_bus: Arc<cortexa_events::EventBus>,
    ) -> Self {
        let gaze_worker = config
            .gaze_worker
            .as_ref()
            .map(|cfg| Arc::new(cfg.worker()));
        Self {
            pool,
            config: Arc::new(config),
            event_bus,
            live_sessions: Arc::new(LiveSessions::default()),
            gaze_worker,
        }
    }
}
