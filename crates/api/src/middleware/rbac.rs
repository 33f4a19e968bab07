//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does not
//! match, so handlers enforce authorization at the type level.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use cortexa_core::error::CoreError;
use cortexa_core::roles::{is_clinician, ROLE_ADMIN, ROLE_PARENT, ROLE_TEACHER, ROLE_THERAPIST};
use cortexa_core::statuses::account;
use cortexa_db::repositories::UserRepo;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    role: &str,
    message: &str,
) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;
    if user.role != role {
        return Err(AppError::Core(CoreError::Forbidden(message.into())));
    }
    Ok(user)
}

/// Requires the `admin` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(user): RequireAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, ROLE_ADMIN, "Admin role required")
            .await
            .map(RequireAdmin)
    }
}

pub struct RequireParent(pub AuthUser);

impl FromRequestParts<AppState> for RequireParent {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, ROLE_PARENT, "Parent role required")
            .await
            .map(RequireParent)
    }
}

pub struct RequireTeacher(pub AuthUser);

impl FromRequestParts<AppState> for RequireTeacher {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, ROLE_TEACHER, "Teacher role required")
            .await
            .map(RequireTeacher)
    }
}

/// Requires a teacher or therapist.
pub struct RequireClinician(pub AuthUser);

impl FromRequestParts<AppState> for RequireClinician {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !is_clinician(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Access denied. Teachers and therapists only.".into(),
            )));
        }
        Ok(RequireClinician(user))
    }
}

/// Requires an approved, active therapist.
///
/// The role comes from the token, but approval can change after the token
/// was issued, so the account status is read from the database.
pub struct RequireTherapist(pub AuthUser);

impl FromRequestParts<AppState> for RequireTherapist {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = require_role(parts, state, ROLE_THERAPIST, "Therapist role required").await?;
        let row = UserRepo::find_by_id(&state.pool, user.user_id)
            .await?
            .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User not found".into())))?;
        if row.status != account::APPROVED || !row.is_active {
            return Err(AppError::Core(CoreError::Forbidden(
                "Therapist account pending approval".into(),
            )));
        }
        Ok(RequireTherapist(user))
    }
}
