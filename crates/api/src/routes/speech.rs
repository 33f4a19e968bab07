//! Route definitions for the `/speech-therapy` resource.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::speech;
use crate::state::AppState;

/// Routes mounted at `/speech-therapy`. All require auth.
///
/// ```text
/// POST   /upload               -> upload (multipart)
/// GET    /child/{childId}      -> for_child
/// GET    /pending              -> pending (teacher or therapist)
/// PUT    /evaluate/{id}        -> evaluate (teacher or therapist)
/// GET    /progress/{childId}   -> progress
/// GET    /audio/{id}           -> audio (Range aware)
/// DELETE /{id}                 -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(speech::upload))
        .route("/child/{child_id}", get(speech::for_child))
        .route("/pending", get(speech::pending))
        .route("/evaluate/{id}", put(speech::evaluate))
        .route("/progress/{child_id}", get(speech::progress))
        .route("/audio/{id}", get(speech::audio))
        .route("/{id}", delete(speech::delete))
}
