//! Repository for the `password_resets` table.

use sqlx::PgPool;
use cortexa_core::types::{DbId, Timestamp};

use crate::models::password_reset::PasswordReset;

const COLUMNS: &str = "id, user_id, otp_hash, expires_at, used_at, created_at, updated_at";

pub struct PasswordResetRepo;

impl PasswordResetRepo {
    /// Issue a new code for a user, invalidating any earlier unused ones.
    pub async fn issue(
        pool: &PgPool,
        user_id: DbId,
        otp_hash: &str,
        expires_at: Timestamp,
    ) -> Result<PasswordReset, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE password_resets SET used_at = NOW()
             WHERE user_id = $1 AND used_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "INSERT INTO password_resets (user_id, otp_hash, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let reset = sqlx::query_as::<_, PasswordReset>(&query)
            .bind(user_id)
            .bind(otp_hash)
            .bind(expires_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(reset)
    }

    /// Find the unused, unexpired code matching `otp_hash`.
    pub async fn find_valid(
        pool: &PgPool,
        user_id: DbId,
        otp_hash: &str,
    ) -> Result<Option<PasswordReset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM password_resets
             WHERE user_id = $1
               AND otp_hash = $2
               AND used_at IS NULL
               AND expires_at > NOW()
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, PasswordReset>(&query)
            .bind(user_id)
            .bind(otp_hash)
            .fetch_optional(pool)
            .await
    }

    /// Mark a code consumed. Returns `false` if it was already used.
    pub async fn consume(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE password_resets SET used_at = NOW() WHERE id = $1 AND used_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
