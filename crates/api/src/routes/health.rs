use axum::extract::State;
use axum::{routing::get, Json, Router};
use chrono::Utc;
use cortexa_core::types::Timestamp;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database or upload storage is unusable.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    pub storage_healthy: bool,
    pub gaze_worker_configured: bool,
    /// Social-attention tests currently held in memory.
    pub live_sessions: usize,
    pub timestamp: Timestamp,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (db, storage) = tokio::join!(
        cortexa_db::health_check(&state.pool),
        tokio::fs::metadata(&state.config.upload_dir),
    );
    let db_healthy = db.is_ok();
    let storage_healthy = storage.is_ok_and(|meta| meta.is_dir());
    if !db_healthy || !storage_healthy {
        tracing::warn!(db_healthy, storage_healthy, "Health check degraded");
    }

    Json(HealthResponse {
        status: if db_healthy && storage_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        storage_healthy,
        gaze_worker_configured: state.gaze_worker.is_some(),
        live_sessions: state.live_sessions.count().await,
        timestamp: Utc::now(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
