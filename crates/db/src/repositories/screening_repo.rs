//! Repository for the `screenings` table.

use sqlx::PgPool;
use cortexa_core::types::{DbId, Timestamp};

use crate::models::screening::{CreateScreening, Screening};

const COLUMNS: &str = "id, user_id, patient_id, child_name, screening_type, result, file_path, \
                        gaze_direction, attention_score, head_pitch, head_yaw, notes, \
                        created_at, updated_at";

pub struct ScreeningRepo;

impl ScreeningRepo {
    pub async fn create(pool: &PgPool, input: &CreateScreening) -> Result<Screening, sqlx::Error> {
        let query = format!(
            "INSERT INTO screenings (user_id, patient_id, child_name, screening_type, result, \
                                     file_path, gaze_direction, attention_score, head_pitch, \
                                     head_yaw, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Screening>(&query)
            .bind(input.user_id)
            .bind(input.patient_id)
            .bind(&input.child_name)
            .bind(&input.screening_type)
            .bind(&input.result)
            .bind(&input.file_path)
            .bind(&input.gaze_direction)
            .bind(input.attention_score)
            .bind(input.head_pitch)
            .bind(input.head_yaw)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    pub async fn list_by_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Screening>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM screenings WHERE user_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Screening>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Screening>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM screenings ORDER BY created_at DESC");
        sqlx::query_as::<_, Screening>(&query).fetch_all(pool).await
    }

    pub async fn latest_for_patient(
        pool: &PgPool,
        patient_id: DbId,
    ) -> Result<Option<Screening>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM screenings
             WHERE patient_id = $1
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, Screening>(&query)
            .bind(patient_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn count_since(pool: &PgPool, since: Timestamp) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM screenings WHERE created_at >= $1")
            .bind(since)
            .fetch_one(pool)
            .await
    }

    /// Creation times within `[from, to)`, for month bucketing.
    pub async fn created_between(
        pool: &PgPool,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Timestamp>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT created_at FROM screenings WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }
}
