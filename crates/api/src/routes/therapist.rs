//! Route definitions for the `/therapist` resource.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::therapist;
use crate::state::AppState;

/// Routes mounted at `/therapist`. All require an approved therapist.
///
/// ```text
/// GET    /profile                          -> profile
/// GET    /clients                          -> clients
/// GET    /slots                            -> list_slots
/// POST   /slots                            -> create_slot
/// DELETE /slots/{id}                       -> delete_slot
/// GET    /slots/available                  -> available_slots (?therapistId, date)
/// GET    /appointments                     -> appointments
/// GET    /appointments/today               -> appointments_today
/// PUT    /appointments/{id}/confirm        -> confirm_appointment
/// PUT    /appointments/{id}/reschedule     -> reschedule_appointment
/// POST   /appointments/complete-session    -> complete_session
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(therapist::profile))
        .route("/clients", get(therapist::clients))
        .route("/slots", get(therapist::list_slots).post(therapist::create_slot))
        .route("/slots/available", get(therapist::available_slots))
        .route("/slots/{id}", delete(therapist::delete_slot))
        .route("/appointments", get(therapist::appointments))
        .route("/appointments/today", get(therapist::appointments_today))
        .route(
            "/appointments/complete-session",
            post(therapist::complete_session),
        )
        .route(
            "/appointments/{id}/confirm",
            put(therapist::confirm_appointment),
        )
        .route(
            "/appointments/{id}/reschedule",
            put(therapist::reschedule_appointment),
        )
}
