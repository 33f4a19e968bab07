//! Route definitions for the `/admin` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::{admin, screenings};
use crate::state::AppState;

/// Routes mounted at `/admin`. All require the admin role.
///
/// ```text
/// GET /metrics                               -> metrics
/// GET /stats                                 -> stats
/// GET /screening-trends                      -> screening_trends
/// GET /screenings                            -> screenings::list_all
/// GET /notifications                         -> notifications
/// GET /therapist-requests                    -> therapist_requests
/// PUT /therapist-requests/{id}/approve       -> approve_therapist
/// PUT /therapist-requests/{id}/reject        -> reject_therapist
/// GET /recent-therapist-requests             -> recent_therapist_requests
/// GET /children-data                         -> children_data
/// GET /children-data/{parentId}              -> children_data_for_parent
/// GET /therapists                            -> therapists
/// PUT /children/{id}/assign-therapist        -> assign_therapist
/// PUT /children/{id}/unassign-therapist      -> unassign_therapist
/// GET /users                                 -> users
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(admin::metrics))
        .route("/stats", get(admin::stats))
        .route("/screening-trends", get(admin::screening_trends))
        .route("/screenings", get(screenings::list_all))
        .route("/notifications", get(admin::notifications))
        .route("/therapist-requests", get(admin::therapist_requests))
        .route(
            "/therapist-requests/{id}/approve",
            put(admin::approve_therapist),
        )
        .route(
            "/therapist-requests/{id}/reject",
            put(admin::reject_therapist),
        )
        .route(
            "/recent-therapist-requests",
            get(admin::recent_therapist_requests),
        )
        .route("/children-data", get(admin::children_data))
        .route(
            "/children-data/{parent_id}",
            get(admin::children_data_for_parent),
        )
        .route("/therapists", get(admin::therapists))
        .route(
            "/children/{id}/assign-therapist",
            put(admin::assign_therapist),
        )
        .route(
            "/children/{id}/unassign-therapist",
            put(admin::unassign_therapist),
        )
        .route("/users", get(admin::users))
}
