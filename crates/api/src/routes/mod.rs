pub mod admin;
pub mod auth;
pub mod behavioral;
pub mod gaze;
pub mod health;
pub mod parent;
pub mod screenings;
pub mod social_attention;
pub mod speech;
pub mod teacher;
pub mod therapist;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /health                                          service + database health (public)
///
/// /register                                        create account (public)
/// /user/me                                         current profile (auth required)
/// /auth/login                                      login (public)
/// /auth/refresh                                    refresh (public)
/// /auth/logout                                     logout (auth required)
/// /auth/forget-password                            request reset code (public)
/// /auth/verify-otp                                 check reset code (public)
/// /auth/reset-password                             consume code, set password (public)
///
/// /parent/profile                                  parent profile
/// /parent/children                                 list, create
/// /parent/children/{id}                            get, update, delete
/// /parent/therapists                               bookable therapists
/// /parent/available-slots                          open times (?therapistId, date)
/// /parent/appointments                             list, book
/// /parent/appointments/{id}                        cancel (DELETE)
///
/// /therapist/profile                               therapist profile
/// /therapist/clients                               assigned patients
/// /therapist/slots                                 list, create availability
/// /therapist/slots/{id}                            delete
/// /therapist/slots/available                       generated times (?therapistId, date)
/// /therapist/appointments                          list
/// /therapist/appointments/today                    today's list
/// /therapist/appointments/{id}/confirm             confirm (PUT)
/// /therapist/appointments/{id}/reschedule          reschedule (PUT)
/// /therapist/appointments/complete-session         complete (POST)
///
/// /teacher/students                                list, create
/// /teacher/students/{id}                           get
/// /teacher/reports                                 list, create
/// /teacher/reports/student/{id}                    reports for a student
///
/// /gaze/...                                        gaze sessions and snapshots
/// /guest/live-gaze/submit                          anonymous gaze submission
/// /social-attention/...                            live preference test
/// /behavioral/...                                  assessment games
/// /speech-therapy/...                              practice recordings
///
/// /screenings                                      list own, create (multipart)
///
/// /admin/...                                       dashboard, approvals, assignment
/// ```
///
/// Unknown paths under `/api` answer with a JSON 404.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        // Account creation and profile.
        .merge(auth::account_router())
        .nest("/auth", auth::router())
        // Role portals.
        .nest("/parent", parent::router())
        .nest("/therapist", therapist::router())
        .nest("/teacher", teacher::router())
        .nest("/admin", admin::router())
        // Screening tools.
        .nest("/gaze", gaze::router())
        .nest("/guest", gaze::guest_router())
        .nest("/social-attention", social_attention::router())
        .nest("/behavioral", behavioral::router())
        .nest("/speech-therapy", speech::router())
        .nest("/screenings", screenings::router())
        .fallback(api_not_found)
}

async fn api_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "API endpoint not found", "code": "NOT_FOUND" })),
    )
}
