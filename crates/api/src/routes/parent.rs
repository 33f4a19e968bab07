//! Route definitions for the `/parent` resource.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::parent;
use crate::state::AppState;

/// Routes mounted at `/parent`. All require the parent role.
///
/// ```text
/// GET    /profile              -> profile
/// GET    /children             -> list_children
/// POST   /children             -> create_child
/// GET    /children/{id}        -> get_child
/// PUT    /children/{id}        -> update_child
/// DELETE /children/{id}        -> delete_child
/// GET    /therapists           -> therapists
/// GET    /available-slots      -> available_slots (?therapistId, date)
/// GET    /appointments         -> appointments
/// POST   /appointments         -> book_appointment
/// DELETE /appointments/{id}    -> cancel_appointment
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(parent::profile))
        .route(
            "/children",
            get(parent::list_children).post(parent::create_child),
        )
        .route(
            "/children/{id}",
            get(parent::get_child)
                .put(parent::update_child)
                .delete(parent::delete_child),
        )
        .route("/therapists", get(parent::therapists))
        .route("/available-slots", get(parent::available_slots))
        .route(
            "/appointments",
            get(parent::appointments).post(parent::book_appointment),
        )
        .route("/appointments/{id}", delete(parent::cancel_appointment))
}
