//! One-time password-reset codes.

use sqlx::FromRow;
use cortexa_core::types::{DbId, Timestamp};

#[derive(Debug, Clone, FromRow)]
pub struct PasswordReset {
    pub id: DbId,
    pub user_id: DbId,
    /// SHA-256 hex of the e-mailed code; the code itself is never stored.
    pub otp_hash: String,
    pub expires_at: Timestamp,
    pub used_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
