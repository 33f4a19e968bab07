//! Route definitions for the `/gaze` and `/guest` resources.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{gaze, guest};
use crate::state::AppState;

/// Routes mounted at `/gaze`.
///
/// ```text
/// POST /session/guest/start                     -> start_guest_session (public)
/// POST /session/start                           -> start_session
/// POST /session/snapshot                        -> upload_snapshot_form (guest or auth)
/// POST /upload                                  -> upload_snapshot_form (guest or auth)
/// POST /snapshot/{sessionId}                    -> upload_snapshot (guest or auth)
/// POST /session/send-for-review                 -> send_for_review (guest or auth)
/// POST /session/end/{sessionId}                 -> end_session (guest or auth)
/// GET  /sessions/active                         -> active_sessions (therapist)
/// GET  /sessions/pending-review                 -> pending_review_sessions (therapist)
/// PUT  /snapshot/{sessionId}/{snapshotId}/notes -> update_snapshot_notes
/// GET  /therapist/sessions/{sessionId}          -> session_detail
/// POST /analyze                                 -> analyze
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session/guest/start", post(gaze::start_guest_session))
        .route("/session/start", post(gaze::start_session))
        .route("/session/snapshot", post(gaze::upload_snapshot_form))
        .route("/upload", post(gaze::upload_snapshot_form))
        .route("/snapshot/{session_id}", post(gaze::upload_snapshot))
        .route("/session/send-for-review", post(gaze::send_for_review))
        .route("/session/end/{session_id}", post(gaze::end_session))
        .route("/sessions/active", get(gaze::active_sessions))
        .route("/sessions/pending-review", get(gaze::pending_review_sessions))
        .route(
            "/snapshot/{session_id}/{snapshot_id}/notes",
            put(gaze::update_snapshot_notes),
        )
        .route(
            "/therapist/sessions/{session_id}",
            get(gaze::session_detail),
        )
        .route("/analyze", post(gaze::analyze))
}

/// Routes mounted at `/guest`.
///
/// ```text
/// POST /live-gaze/submit  -> submit_live_gaze (public)
/// ```
pub fn guest_router() -> Router<AppState> {
    Router::new().route("/live-gaze/submit", post(guest::submit_live_gaze))
}
