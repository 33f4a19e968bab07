//! Route definitions for the `/teacher` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::teacher;
use crate::state::AppState;

/// Routes mounted at `/teacher`. All require the teacher role.
///
/// ```text
/// GET  /students               -> list_students
/// POST /students               -> create_student
/// GET  /students/{id}          -> get_student
/// GET  /reports                -> list_reports
/// POST /reports                -> create_report
/// GET  /reports/student/{id}   -> reports_for_student
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/students",
            get(teacher::list_students).post(teacher::create_student),
        )
        .route("/students/{id}", get(teacher::get_student))
        .route(
            "/reports",
            get(teacher::list_reports).post(teacher::create_report),
        )
        .route("/reports/student/{id}", get(teacher::reports_for_student))
}
