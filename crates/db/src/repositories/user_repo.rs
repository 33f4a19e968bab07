//! Repository for the `users` table.

use sqlx::PgPool;
use cortexa_core::roles::ROLE_THERAPIST;
use cortexa_core::statuses::account;
use cortexa_core::types::{DbId, Timestamp};

use crate::models::user::{CreateUser, User};

const COLUMNS: &str = "id, username, email, password_hash, role, status, is_active, \
                        first_name, last_name, phone, license_number, qualification, \
                        rejection_reason, last_login_at, failed_login_count, locked_until, \
                        created_at, updated_at";

/// Accounts of every role. E-mails are stored lower-cased by the caller.
pub struct UserRepo;

impl UserRepo {
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, email, password_hash, role, status, first_name, \
                                last_name, phone, license_number, qualification)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.role)
            .bind(&input.status)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.phone)
            .bind(&input.license_number)
            .bind(&input.qualification)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email. Emails are stored lower-cased.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users ORDER BY created_at DESC");
        sqlx::query_as::<_, User>(&query).fetch_all(pool).await
    }

    /// Therapists in the given account status, newest first, up to `limit`.
    pub async fn list_therapists_by_status(
        pool: &PgPool,
        status: &str,
        limit: Option<i64>,
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE role = $1 AND status = $2
             ORDER BY created_at DESC
             LIMIT $3"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(ROLE_THERAPIST)
            .bind(status)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Approved, active therapists ordered by name.
    pub async fn list_bookable_therapists(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE role = $1 AND status = $2 AND is_active = true
             ORDER BY first_name NULLS LAST, username"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(ROLE_THERAPIST)
            .bind(account::APPROVED)
            .fetch_all(pool)
            .await
    }

    /// Find a therapist that can take bookings and patients.
    pub async fn find_bookable_therapist(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE id = $1 AND role = $2 AND status = $3 AND is_active = true"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(ROLE_THERAPIST)
            .bind(account::APPROVED)
            .fetch_optional(pool)
            .await
    }

    /// Move a pending therapist to `status`. Approval activates the account,
    /// rejection deactivates it.
    ///
    /// Returns `None` when the user is not a pending therapist.
    pub async fn decide_therapist_request(
        pool: &PgPool,
        id: DbId,
        status: &str,
        rejection_reason: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET status = $3, rejection_reason = $4, is_active = ($3 = 'approved')
             WHERE id = $1 AND role = $2 AND status = 'pending'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(ROLE_THERAPIST)
            .bind(status)
            .bind(rejection_reason)
            .fetch_optional(pool)
            .await
    }

    /// Count therapists awaiting approval.
    pub async fn count_pending_therapists(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1 AND status = 'pending'")
            .bind(ROLE_THERAPIST)
            .fetch_one(pool)
            .await
    }

    /// Count active users whose account was not rejected.
    pub async fn count_active(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE is_active = true AND status <> 'rejected'",
        )
        .fetch_one(pool)
        .await
    }

    /// Count one failed login and return the new total. A lock that has
    /// already lapsed is cleared and counting restarts at 1.
    pub async fn increment_failed_login(pool: &PgPool, id: DbId) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE users SET
                failed_login_count = CASE WHEN locked_until <= NOW() THEN 1
                                          ELSE failed_login_count + 1 END,
                locked_until = CASE WHEN locked_until <= NOW() THEN NULL
                                    ELSE locked_until END
             WHERE id = $1
             RETURNING failed_login_count",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn lock_account(
        pool: &PgPool,
        id: DbId,
        until: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET locked_until = $2 WHERE id = $1")
            .bind(id)
            .bind(until)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Clears the lockout state and stamps `last_login_at`.
    pub async fn record_successful_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET
                failed_login_count = 0,
                locked_until = NULL,
                last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, failed_login_count = 0, locked_until = NULL
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
