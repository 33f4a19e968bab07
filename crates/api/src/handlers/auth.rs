//! Handlers for registration, login, token rotation, and password resets.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use cortexa_core::error::CoreError;
use cortexa_core::roles::{is_valid_role, ROLE_THERAPIST};
use cortexa_core::statuses::account;
use cortexa_core::types::DbId;
use cortexa_db::models::user::{CreateUser, User, UserResponse};
use cortexa_db::repositories::{PasswordResetRepo, RefreshTokenRepo, UserRepo};
use cortexa_events::AccountEvent;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::otp::{self, OTP_VALIDITY_MINS};
use crate::auth::password::{
    hash_password, validate_password_strength, verify_password, MIN_PASSWORD_LENGTH,
};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::MessageResponse;
use crate::state::AppState;

/// Consecutive bad passwords that trigger a lockout.
const MAX_FAILED_ATTEMPTS: i32 = 5;

const LOCK_DURATION_MINS: i64 = 15;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_OTP: &str = "Invalid or expired OTP";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: Option<String>,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    pub password: String,
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub license_number: Option<String>,
    pub qualification: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// The portal the user is signing in to; must match the account role.
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgetPasswordRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

/// Returned by register, login and refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /register
///
/// Therapists start out pending until an admin approves them.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    input.validate()?;
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    if !is_valid_role(&input.role) {
        return Err(AppError::Core(CoreError::Validation("Invalid role".into())));
    }

    let email = normalize_email(&input.email);
    if UserRepo::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(
            "An account with this email already exists".into(),
        )));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let status = if input.role == ROLE_THERAPIST {
        account::PENDING
    } else {
        account::APPROVED
    };

    let username = input
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username,
            email,
            password_hash,
            role: input.role,
            status: status.to_string(),
            first_name: input.first_name,
            last_name: input.last_name,
            phone: input.phone,
            license_number: input.license_number,
            qualification: input.qualification,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, role = %user.role, status = %user.status, "User registered");

    let response = create_auth_response(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let invalid = || AppError::Core(CoreError::Unauthorized(INVALID_CREDENTIALS.into()));

    // 1. Find user by email.
    let user = UserRepo::find_by_email(&state.pool, &normalize_email(&input.email))
        .await?
        .ok_or_else(invalid)?;

    // 2. A login from another role's portal is treated like a bad credential.
    if let Some(role) = input.role.as_deref().filter(|r| !r.is_empty()) {
        if role != user.role {
            return Err(invalid());
        }
    }

    // 3. Deactivated or rejected accounts cannot sign in.
    if !user.is_active || user.status == account::REJECTED {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    // 4. Temporary lock after repeated failures.
    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is temporarily locked. Try again later.".into(),
            )));
        }
    }

    // 5. Verify password, counting failures.
    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        let failures = UserRepo::increment_failed_login(&state.pool, user.id).await?;
        if failures >= MAX_FAILED_ATTEMPTS {
            let lock_until = Utc::now() + chrono::Duration::minutes(LOCK_DURATION_MINS);
            UserRepo::lock_account(&state.pool, user.id, lock_until).await?;
            tracing::warn!(user_id = user.id, failures, "Account locked after failed logins");
        }
        return Err(invalid());
    }

    // 6. Reset counters and issue tokens.
    UserRepo::record_successful_login(&state.pool, user.id).await?;
    let response = create_auth_response(&state, &user).await?;
    Ok(Json(response))
}

/// POST /auth/refresh
///
/// Trade a refresh token for a new token pair.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let token_hash = hash_refresh_token(&input.refresh_token);

    // Rotation: the presented token is consumed and can never be reused.
    let user_id = RefreshTokenRepo::consume(&state.pool, &token_hash)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid or expired refresh token".into(),
            ))
        })?;

    let user = UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    if !user.is_active || user.status == account::REJECTED {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let response = create_auth_response(&state, &user).await?;
    Ok(Json(response))
}

/// POST /auth/logout
///
/// Revoke every refresh token of the authenticated user. Returns 204 No Content.
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    RefreshTokenRepo::revoke_all_for_user(&state.pool, auth_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/forget-password
///
/// Always answers 200 so the endpoint cannot be used to probe for accounts.
pub async fn forget_password(
    State(state): State<AppState>,
    Json(input): Json<ForgetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    input.validate()?;
    let email = normalize_email(&input.email);

    if let Some(user) = UserRepo::find_by_email(&state.pool, &email).await? {
        let code = otp::generate_otp();
        let expires_at = Utc::now() + otp::validity();
        PasswordResetRepo::issue(&state.pool, user.id, &otp::hash_otp(&code), expires_at).await?;

        state.event_bus.publish(
            AccountEvent::PasswordResetRequested {
                user_id: user.id,
                email: user.email.clone(),
                otp: code,
                expires_in_minutes: OTP_VALIDITY_MINS,
            },
            None,
        );
        tracing::info!(user_id = user.id, "Password reset code issued");
    }

    Ok(Json(MessageResponse::new(
        "If an account exists for this email, a reset code has been sent",
    )))
}

/// POST /auth/verify-otp
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(input): Json<VerifyOtpRequest>,
) -> AppResult<Json<MessageResponse>> {
    find_reset(&state, &input.email, &input.otp).await?;
    Ok(Json(MessageResponse::new("OTP verified")))
}

/// POST /auth/reset-password
///
/// Consumes the code, replaces the password and signs out every session.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    validate_password_strength(&input.new_password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let (user, reset_id) = find_reset(&state, &input.email, &input.otp).await?;

    // A concurrent reset may have used the code between lookup and here.
    if !PasswordResetRepo::consume(&state.pool, reset_id).await? {
        return Err(AppError::BadRequest(INVALID_OTP.into()));
    }

    let password_hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    UserRepo::update_password(&state.pool, user.id, &password_hash).await?;
    RefreshTokenRepo::revoke_all_for_user(&state.pool, user.id).await?;

    tracing::info!(user_id = user.id, "Password reset completed");
    Ok(Json(MessageResponse::new("Password has been reset successfully")))
}

/// GET /user/me
pub async fn me(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<Json<UserResponse>> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth_user.user_id,
        }))?;
    Ok(Json(UserResponse::from(&user)))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Look up an unexpired, unused reset code. Every failure is the same 400.
async fn find_reset(state: &AppState, email: &str, code: &str) -> AppResult<(User, DbId)> {
    let invalid = || AppError::BadRequest(INVALID_OTP.into());
    if !otp::is_well_formed(code) {
        return Err(invalid());
    }
    let user = UserRepo::find_by_email(&state.pool, &normalize_email(email))
        .await?
        .ok_or_else(invalid)?;
    let reset = PasswordResetRepo::find_valid(&state.pool, user.id, &otp::hash_otp(code))
        .await?
        .ok_or_else(invalid)?;
    Ok((user, reset.id))
}

/// Issue an access token plus a stored refresh token.
async fn create_auth_response(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let token = generate_access_token(user.id, &user.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let (refresh_plaintext, refresh_hash) = generate_refresh_token();
    let expires_at =
        Utc::now() + chrono::Duration::days(state.config.jwt.refresh_token_expiry_days);

    RefreshTokenRepo::issue(&state.pool, user.id, &refresh_hash, expires_at).await?;

    Ok(AuthResponse {
        token,
        refresh_token: refresh_plaintext,
        expires_in: state.config.jwt.access_ttl_secs(),
        user: UserResponse::from(user),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_case_folded() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
    }

    #[test]
    fn register_rejects_malformed_email() {
        let req = RegisterRequest {
            username: None,
            email: "not-an-email".into(),
            password: "long-enough".into(),
            role: "parent".into(),
            first_name: None,
            last_name: None,
            phone: None,
            license_number: None,
            qualification: None,
        };
        let err = AppError::from(req.validate().unwrap_err());
        assert!(matches!(
            err,
            AppError::Core(CoreError::Validation(ref m)) if m == "A valid email is required"
        ));
    }
}
