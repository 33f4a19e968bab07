//! Route definitions for the `/behavioral` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::behavioral;
use crate::state::AppState;

/// Routes mounted at `/behavioral`. All require auth.
///
/// ```text
/// POST /submit                  -> submit
/// GET  /student/{studentId}     -> for_student
/// GET  /tool/{type}             -> for_tool
/// GET  /session/{id}            -> session
/// GET  /stats                   -> stats
/// GET  /analyze/{studentId}     -> analyze
/// POST /score/{type}            -> score
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/submit", post(behavioral::submit))
        .route("/student/{student_id}", get(behavioral::for_student))
        .route("/tool/{assessment_type}", get(behavioral::for_tool))
        .route("/session/{id}", get(behavioral::session))
        .route("/stats", get(behavioral::stats))
        .route("/analyze/{student_id}", get(behavioral::analyze))
        .route("/score/{assessment_type}", post(behavioral::score))
}
