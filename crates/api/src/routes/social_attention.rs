//! Route definitions for the `/social-attention` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::social_attention;
use crate::state::AppState;

/// Routes mounted at `/social-attention`.
///
/// ```text
/// POST /start               -> start
/// POST /frame               -> frame
/// POST /finish              -> finish
/// POST /end                 -> finish
/// GET  /{sessionId}/result  -> result
/// POST /therapist/save      -> save_direct_score
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(social_attention::start))
        .route("/frame", post(social_attention::frame))
        .route("/finish", post(social_attention::finish))
        .route("/end", post(social_attention::finish))
        .route("/therapist/save", post(social_attention::save_direct_score))
        .route("/{session_id}/result", get(social_attention::result))
}
