//! Route definitions for the `/screenings` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::screenings;
use crate::state::AppState;

/// Routes mounted at `/screenings`.
///
/// ```text
/// GET  /  -> list_own
/// POST /  -> create (multipart)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(screenings::list_own).post(screenings::create))
}
