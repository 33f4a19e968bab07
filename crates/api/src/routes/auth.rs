//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /login            -> login
/// POST /refresh          -> refresh
/// POST /logout           -> logout (requires auth)
/// POST /forget-password  -> forget_password
/// POST /verify-otp       -> verify_otp
/// POST /reset-password   -> reset_password
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/forget-password", post(auth::forget_password))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/reset-password", post(auth::reset_password))
}

/// Account routes mounted at the API root.
///
/// ```text
/// POST /register  -> register
/// GET  /user/me   -> me (requires auth)
/// ```
pub fn account_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/user/me", get(auth::me))
}
